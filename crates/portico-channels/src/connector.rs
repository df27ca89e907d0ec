//! Component registry.
//!
//! The [`ComponentConnector`] maps component identities to their
//! [`Subscriptor`]. It holds no reference to the component itself: hosts are
//! expected to call [`unregister`](ComponentConnector::unregister) when a
//! component is torn down.

use crate::channel::Channel;
use crate::envelope::Envelope;
use crate::subscriptor::{Publication, Subscriptor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a UI component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
	/// Returns a fresh, process-unique id.
	pub fn new() -> Self {
		Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Wraps a host-supplied identifier.
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw identifier.
	pub fn as_raw(&self) -> u64 {
		self.0
	}
}

impl Default for ComponentId {
	fn default() -> Self {
		Self::new()
	}
}

/// Registry of one [`Subscriptor`] per component.
#[derive(Debug, Default)]
pub struct ComponentConnector {
	subscriptors: HashMap<ComponentId, Subscriptor>,
}

impl ComponentConnector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the component's subscriptor, creating it on first use.
	pub fn subscriptor(&mut self, component: ComponentId) -> &mut Subscriptor {
		self.subscriptors
			.entry(component)
			.or_insert_with(|| Subscriptor::new(component))
	}

	/// Returns the component's subscriptor if it has one.
	pub fn get(&self, component: ComponentId) -> Option<&Subscriptor> {
		self.subscriptors.get(&component)
	}

	/// Subscribes `component` to `channel`. See [`Subscriptor::subscribe`].
	pub fn subscribe<T, F>(
		&mut self,
		component: ComponentId,
		channel: &Channel<T>,
		callback: F,
		previous_state: bool,
		bind: Option<String>,
	) -> bool
	where
		T: Clone + 'static,
		F: Fn(&Envelope<T>) + 'static,
	{
		self.subscriptor(component)
			.subscribe(channel, callback, previous_state, bind)
	}

	/// Records an outbound binding owned by `component`.
	pub fn publish(&mut self, component: ComponentId, publication: Publication) {
		self.subscriptor(component).publish(publication);
	}

	/// Tears down the component's bindings.
	///
	/// The subscriptor is dropped once nothing is left on it; when private
	/// subscriptions are kept it stays registered so a later call with
	/// `clean_private == true` can release them. Returns `true` if the
	/// component is no longer registered.
	pub fn unregister(&mut self, component: ComponentId, clean_private: bool) -> bool {
		let Some(subscriptor) = self.subscriptors.get_mut(&component) else {
			return true;
		};
		subscriptor.unsubscribe(clean_private);
		if subscriptor.subscriptions().is_empty() {
			self.subscriptors.remove(&component);
			tracing::debug!(component = component.as_raw(), "unregistered component");
			return true;
		}
		false
	}

	/// Returns `true` if the component has a subscriptor.
	pub fn contains(&self, component: ComponentId) -> bool {
		self.subscriptors.contains_key(&component)
	}

	/// Number of registered components.
	pub fn len(&self) -> usize {
		self.subscriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscriptors.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn connector() -> ComponentConnector {
		ComponentConnector::new()
	}

	#[rstest]
	fn test_component_ids_are_unique() {
		assert_ne!(ComponentId::new(), ComponentId::new());
		assert_eq!(ComponentId::from_raw(7).as_raw(), 7);
	}

	#[rstest]
	fn test_subscriptor_created_on_first_use(mut connector: ComponentConnector) {
		// Arrange
		let component = ComponentId::new();
		assert!(!connector.contains(component));

		// Act
		connector.subscriptor(component);
		connector.subscriptor(component);

		// Assert
		assert_eq!(connector.len(), 1);
		assert_eq!(connector.get(component).map(|s| s.node()), Some(component));
	}

	#[rstest]
	fn test_unregister_removes_fully_released_component(mut connector: ComponentConnector) {
		let channel = Channel::<i32>::new("cart");
		let component = ComponentId::new();
		connector.subscribe(component, &channel, |_| {}, false, None);

		assert!(connector.unregister(component, false));

		assert!(connector.is_empty());
		assert_eq!(channel.observer_count(), 0);
	}

	#[rstest]
	fn test_unregister_keeps_component_with_private_subscriptions(mut connector: ComponentConnector) {
		// Arrange
		let page = Channel::<bool>::new("__bridge_page_home");
		let component = ComponentId::new();
		connector.subscribe(component, &page, |_| {}, true, None);
		connector.publish(component, Publication::new("cart"));

		// Act
		let released = connector.unregister(component, false);

		// Assert
		assert!(!released);
		assert!(connector.contains(component));
		assert_eq!(page.observer_count(), 1);
		assert!(connector.unregister(component, true));
		assert_eq!(page.observer_count(), 0);
	}

	#[rstest]
	fn test_unregister_unknown_component(mut connector: ComponentConnector) {
		assert!(connector.unregister(ComponentId::new(), false));
	}
}
