//! # portico-router
//!
//! Client-side routing for single-page applications: route patterns,
//! navigation history with skip rules, interception, and address-bar
//! synchronization.
//!
//! ## Route Patterns
//!
//! - `/categories/:name` - one segment per `:name`
//! - `/docs/*` - prefix route; the remainder becomes the route's `subroute`
//! - several templates per route act as aliases, first match wins
//!
//! Captured segments that read as numbers are coerced (`/test/1` yields
//! `id = 1`).
//!
//! ## Example
//!
//! ```
//! use portico_router::{AddressBar, MemoryAddressBar, RouteDefinition, Router, RouterSettings};
//! use portico_router::params::{ParamValue, params};
//! use std::rc::Rc;
//!
//! let bar = MemoryAddressBar::default();
//! let settings = RouterSettings::new().with_main_node("main").with_routes(vec![
//!     RouteDefinition::new("home", "/"),
//!     RouteDefinition::new("category", "/categories/:name"),
//! ]);
//! let mut router = Router::from_settings(settings, Rc::new(bar.clone())).unwrap();
//!
//! router.go("category", params([("name", ParamValue::from("service"))])).unwrap();
//!
//! assert_eq!(bar.read(), "#!/categories/service");
//! assert_eq!(router.current_route().unwrap().name, "category");
//! ```

pub mod activation;
pub mod address;
pub mod error;
pub mod events;
pub mod interceptor;
pub mod navigation_stack;
pub mod notify;
pub mod params;
pub mod route;
pub mod router;
pub mod settings;

pub use activation::{Activation, ImmediateActivator, PageActivator};
pub use address::{AddressBar, AddressStrategy, DEFAULT_HASH_PREFIX, MemoryAddressBar};
pub use error::{RouterError, RouterResult};
pub use events::{EventBus, ListenerId, RouterEvent};
pub use interceptor::{Interception, Interceptor, InterceptorContext};
pub use navigation_stack::{Navigation, NavigationStack, RoutePage};
pub use notify::{
	APP_CONTEXT_CHANNEL, AppContext, CANCELLED_BACK_NAVIGATION_CHANNEL,
	INTERCEPTED_NAVIGATION_CHANNEL, InterceptedNavigation, page_channel,
};
pub use params::{ParamValue, Params};
pub use route::{PathMatch, Route, RouteAction, RouteSnapshot};
pub use router::{BackNavigation, NavigationOutcome, Router, RouterState};
pub use settings::{RouteDefinition, RoutePaths, RouterSettings};
