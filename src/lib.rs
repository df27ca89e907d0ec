//! # Portico
//!
//! Navigation and channel core for single-page applications built from web
//! components.
//!
//! Portico keeps the address bar, the navigation history and the active page
//! in sync, and lets components talk to each other through named channels that
//! replay their last value to late subscribers.
//!
//! ## Crates
//!
//! - [`channels`] (`portico-channels`): replay-last-value channels, the
//!   per-component subscription ledger and the component registry
//! - [`router`] (`portico-router`): route patterns, the navigation stack with
//!   skip rules, interception and the routing state machine
//!
//! [`Bridge`] ties both together as the application instance.
//!
//! ## Quick Example
//!
//! ```
//! use portico::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let bar = MemoryAddressBar::default();
//! let settings = RouterSettings::new().with_main_node("main").with_routes(vec![
//!     RouteDefinition::new("home", "/"),
//!     RouteDefinition::new("category", "/categories/:name"),
//! ]);
//! let mut bridge = Bridge::from_settings(settings, Rc::new(bar.clone())).unwrap();
//!
//! // A component follows the active page.
//! let pages = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&pages);
//! bridge.subscribe::<AppContext, _>(
//!     ComponentId::new(),
//!     APP_CONTEXT_CHANNEL,
//!     move |envelope| sink.borrow_mut().push(envelope.payload.current_page.clone()),
//!     false,
//!     None,
//! );
//!
//! bridge.router_mut().go("home", Params::new()).unwrap();
//! bridge
//!     .router_mut()
//!     .go("category", params([("name", ParamValue::from("service"))]))
//!     .unwrap();
//!
//! assert_eq!(bar.read(), "#!/categories/service");
//! assert_eq!(*pages.borrow(), vec!["home", "category"]);
//! ```

pub mod bridge;

pub use bridge::Bridge;

/// Channels, subscriptors and the component registry.
pub mod channels {
	pub use portico_channels::*;
}

/// Routes, navigation history and the router.
pub mod router {
	pub use portico_router::*;
}

/// Re-exports of commonly used types.
pub mod prelude {
	pub use crate::Bridge;

	// Channels
	pub use portico_channels::{
		Channel, ChannelError, ChannelManager, ComponentConnector, ComponentId, Envelope,
		Publication, Subscription, Subscriptor, is_private_channel,
	};

	// Routing
	pub use portico_router::params::params;
	pub use portico_router::{
		APP_CONTEXT_CHANNEL, AddressBar, AddressStrategy, AppContext, BackNavigation,
		InterceptedNavigation, Interception, InterceptorContext, MemoryAddressBar, Navigation,
		NavigationOutcome, ParamValue, Params, Route, RouteDefinition, RoutePage, RouteSnapshot,
		Router, RouterError, RouterEvent, RouterResult, RouterSettings, page_channel,
	};
}
