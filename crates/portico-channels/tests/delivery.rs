//! Integration tests for replay, no-replay suppression and private channels.

use portico_channels::{ChannelManager, ComponentConnector, ComponentId, Envelope};
use rstest::{fixture, rstest};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
struct Cart {
	items: u32,
}

#[fixture]
fn manager() -> ChannelManager {
	ChannelManager::new()
}

fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(&Envelope<Cart>) + 'static) {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	(seen, move |envelope: &Envelope<Cart>| {
		sink.borrow_mut().push(envelope.payload.items)
	})
}

#[rstest]
fn test_replay_then_dedup(manager: ChannelManager) {
	// Arrange
	let cart = manager.get::<Cart>("cart");
	let mut connector = ComponentConnector::new();
	let badge = ComponentId::new();
	cart.next(Cart { items: 1 });
	let published = cart.last().unwrap();
	let (seen, callback) = recorder();

	// Act: late subscription replays the last value once
	connector.subscribe(badge, &cart, callback, false, None);
	assert_eq!(*seen.borrow(), vec![1]);

	// Act: republishing the same stamped value is suppressed
	cart.next(published.clone());
	assert_eq!(*seen.borrow(), vec![1]);

	// Act: a genuinely new value is delivered
	cart.next(Cart { items: 2 });

	// Assert
	assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[rstest]
fn test_publish_then_subscribe_same_component(manager: ChannelManager) {
	// A component publishing and listening on the same channel reacts to its
	// own value exactly once.
	let cart = manager.get::<Cart>("cart");
	let mut connector = ComponentConnector::new();
	let component = ComponentId::new();
	let (seen, callback) = recorder();
	connector.subscribe(component, &cart, callback, false, None);

	manager.publish::<Cart>("cart", Cart { items: 3 });
	connector.subscriptor(component).unsubscribe(false);
	let (again, callback) = recorder();
	connector.subscribe(component, &cart, callback, false, None);

	assert_eq!(*seen.borrow(), vec![3]);
	assert!(again.borrow().is_empty());
}

#[rstest]
fn test_components_dedup_independently(manager: ChannelManager) {
	// Arrange
	let cart = manager.get::<Cart>("cart");
	let mut connector = ComponentConnector::new();
	let (first_seen, first) = recorder();
	let (second_seen, second) = recorder();
	cart.next(Cart { items: 4 });

	// Act
	connector.subscribe(ComponentId::new(), &cart, first, false, None);
	connector.subscribe(ComponentId::new(), &cart, second, false, None);

	// Assert
	assert_eq!(*first_seen.borrow(), vec![4]);
	assert_eq!(*second_seen.borrow(), vec![4]);
}

#[rstest]
#[case("__bridge_app", false)]
#[case("__bridge_page_home", false)]
#[case("app", true)]
#[case("page_home", true)]
fn test_private_channel_protection(manager: ChannelManager, #[case] name: &str, #[case] delivered: bool) {
	// Arrange
	let mut connector = ComponentConnector::new();
	let (seen, callback) = recorder();
	let channel = manager.get::<Cart>(name);
	connector.subscribe(ComponentId::new(), &channel, callback, true, None);

	// Act
	let accepted = manager.publish::<Cart>(name, Cart { items: 5 });

	// Assert
	assert_eq!(accepted, delivered);
	assert_eq!(!seen.borrow().is_empty(), delivered);
}

#[rstest]
fn test_clean_all_channels_on_logout(manager: ChannelManager) {
	// Arrange
	let cart = manager.get::<Cart>("cart");
	let (seen, callback) = recorder();
	cart.subscribe(callback);
	cart.next(Cart { items: 1 });

	// Act
	manager.clean_all_channels();
	cart.next(Cart { items: 2 });

	// Assert
	assert_eq!(*seen.borrow(), vec![1]);
	assert_eq!(cart.last().map(|e| e.payload.items), Some(2));
}
