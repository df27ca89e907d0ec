//! The application instance.
//!
//! A [`Bridge`] owns the router, the channel registry and the component
//! registry of one application. It is created once by the host and passed by
//! reference to whatever needs navigation or channels.

use portico_channels::{ChannelManager, ComponentConnector, ComponentId, Envelope, Publication};
use portico_router::{AddressBar, Router, RouterResult, RouterSettings};
use std::rc::Rc;

/// Router, channels and component registry of one application.
#[derive(Debug)]
pub struct Bridge {
	router: Router,
	channels: ChannelManager,
	connector: ComponentConnector,
}

impl Bridge {
	/// Wraps `router`, attaching a fresh channel manager to it.
	pub fn new(mut router: Router) -> Self {
		let channels = ChannelManager::new();
		router.set_channels(channels.clone());
		Self {
			router,
			channels,
			connector: ComponentConnector::new(),
		}
	}

	/// Builds the router from `settings` and wraps it.
	///
	/// # Errors
	///
	/// Propagates [`Router::from_settings`] errors.
	pub fn from_settings(settings: RouterSettings, address_bar: Rc<dyn AddressBar>) -> RouterResult<Self> {
		Router::from_settings(settings, address_bar).map(Self::new)
	}

	/// Publishes `value` on the channel named `channel`.
	///
	/// Private channels are rejected and `false` is returned.
	pub fn publish<T: Clone + 'static>(&self, channel: &str, value: impl Into<Envelope<T>>) -> bool {
		self.channels.publish::<T>(channel, value)
	}

	/// Subscribes `component` to the channel named `channel`, creating the
	/// channel if needed.
	///
	/// Returns `false` if the component was already subscribed to it.
	pub fn subscribe<T, F>(
		&mut self,
		component: ComponentId,
		channel: &str,
		callback: F,
		previous_state: bool,
		bind: Option<String>,
	) -> bool
	where
		T: Clone + 'static,
		F: Fn(&Envelope<T>) + 'static,
	{
		let channel = self.channels.get::<T>(channel);
		self.connector
			.subscribe(component, &channel, callback, previous_state, bind)
	}

	/// Records an outbound binding owned by `component`.
	pub fn bind_publication(&mut self, component: ComponentId, publication: Publication) {
		self.connector.publish(component, publication);
	}

	/// Tears down everything `component` subscribed to or published.
	///
	/// Subscriptions to private channels survive unless `clean_private` is set.
	pub fn unregister_component(&mut self, component: ComponentId, clean_private: bool) -> bool {
		self.connector.unregister(component, clean_private)
	}

	pub fn router(&self) -> &Router {
		&self.router
	}

	pub fn router_mut(&mut self) -> &mut Router {
		&mut self.router
	}

	pub fn channels(&self) -> &ChannelManager {
		&self.channels
	}

	pub fn connector(&self) -> &ComponentConnector {
		&self.connector
	}

	pub fn connector_mut(&mut self) -> &mut ComponentConnector {
		&mut self.connector
	}

	/// Full application teardown.
	///
	/// Every channel is emptied (replay buffers and subscribers), and the
	/// router forgets its current route and history. Channel handles held by
	/// components stay valid.
	pub fn logout(&mut self) {
		self.channels.clean_all_channels();
		self.router.reset();
		tracing::info!(channels = self.channels.len(), "application state cleared");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use portico_router::{MemoryAddressBar, Params, RouteDefinition};
	use rstest::{fixture, rstest};
	use std::cell::RefCell;

	#[fixture]
	fn bridge() -> Bridge {
		let settings = RouterSettings::new().with_main_node("main").with_routes(vec![
			RouteDefinition::new("home", "/"),
			RouteDefinition::new("cart", "/cart"),
		]);
		Bridge::from_settings(settings, Rc::new(MemoryAddressBar::default())).unwrap()
	}

	#[rstest]
	fn test_publish_rejects_private_channel(bridge: Bridge) {
		assert!(!bridge.publish::<u32>("__bridge_app", 1));
		assert!(bridge.publish::<u32>("cart", 1));
	}

	#[rstest]
	fn test_subscribe_twice_keeps_first(mut bridge: Bridge) {
		let component = ComponentId::new();

		assert!(bridge.subscribe::<u32, _>(component, "cart", |_| {}, false, None));
		assert!(!bridge.subscribe::<u32, _>(component, "cart", |_| {}, false, None));
		assert_eq!(bridge.connector().len(), 1);
	}

	#[rstest]
	fn test_router_publishes_on_bridge_channels(mut bridge: Bridge) {
		// Arrange
		let pages = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&pages);
		let component = ComponentId::new();
		bridge.subscribe::<bool, _>(
			component,
			"__bridge_page_cart",
			move |envelope| sink.borrow_mut().push(envelope.payload),
			false,
			None,
		);

		// Act
		bridge.router_mut().go("cart", Params::new()).unwrap();

		// Assert
		assert_eq!(*pages.borrow(), vec![true]);
	}

	#[rstest]
	fn test_logout_clears_router_and_channels(mut bridge: Bridge) {
		// Arrange
		bridge.router_mut().go("home", Params::new()).unwrap();
		bridge.publish::<u32>("cart", 3);

		// Act
		bridge.logout();

		// Assert
		assert!(bridge.router().current_route().is_none());
		assert!(bridge.router().navigation_stack().is_empty());
		assert!(bridge.channels().get::<u32>("cart").last().is_none());
		assert!(bridge.channels().contains("cart"));
	}
}
