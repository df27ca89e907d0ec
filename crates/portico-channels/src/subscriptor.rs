//! Per-component subscription ledger.
//!
//! A [`Subscriptor`] tracks everything one component is connected to: the
//! channels it listens on, the outbound bindings it owns, and, per channel
//! name, the stamp of the last value it observed.
//!
//! ## No-replay delivery
//!
//! Channels replay their last value to every new subscriber. Without a filter
//! a component that re-subscribes, or that publishes on a channel it also
//! listens to, would act on the same value twice. In no-replay mode the
//! subscriber callback is wrapped and only fires when the delivered stamp is
//! newer than the last one observed for that channel name:
//!
//! | delivered vs. observed               | fires |
//! |--------------------------------------|-------|
//! | nothing observed yet                 | yes   |
//! | later timestamp                      | yes   |
//! | same timestamp, different id         | yes   |
//! | same timestamp, same or unknown id   | no    |
//! | earlier timestamp                    | no    |
//!
//! Every delivery overwrites the observed stamp with the delivered one,
//! whether or not the callback runs.

use crate::channel::{Channel, ChannelId, Subscription, is_private_channel};
use crate::connector::ComponentId;
use crate::envelope::Envelope;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Stamp of the last value a component observed on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedStamp {
	/// Timestamp of the observed value.
	pub timestamp: i64,
	/// Id of the observed value, if known.
	pub id: Option<Uuid>,
}

type Ledger = Rc<RefCell<HashMap<String, ObservedStamp>>>;

/// One live subscription owned by a component.
#[derive(Debug)]
pub struct SubscriptionRecord {
	channel_id: ChannelId,
	channel_name: String,
	bind: Option<String>,
	node: ComponentId,
	handle: Subscription,
}

impl SubscriptionRecord {
	/// Name of the subscribed channel.
	pub fn channel_name(&self) -> &str {
		&self.channel_name
	}

	/// Component property or method the channel is bound to, if any.
	pub fn bind(&self) -> Option<&str> {
		self.bind.as_deref()
	}

	/// The subscribing component.
	pub fn node(&self) -> ComponentId {
		self.node
	}

	/// The underlying channel subscription.
	pub fn handle(&self) -> &Subscription {
		&self.handle
	}
}

/// An outbound binding owned by a component, e.g. a DOM event that publishes
/// onto a channel.
pub struct Publication {
	channel: String,
	bind: Option<String>,
	teardown: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Publication {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Publication")
			.field("channel", &self.channel)
			.field("bind", &self.bind)
			.field("has_teardown", &self.teardown.is_some())
			.finish()
	}
}

impl Publication {
	/// Creates a publication record for `channel`.
	pub fn new(channel: impl Into<String>) -> Self {
		Self {
			channel: channel.into(),
			bind: None,
			teardown: None,
		}
	}

	/// Sets the component event the publication is bound to.
	pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
		self.bind = Some(bind.into());
		self
	}

	/// Sets the closure that releases the binding on teardown.
	pub fn with_teardown<F>(mut self, teardown: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		self.teardown = Some(Box::new(teardown));
		self
	}

	/// Name of the target channel.
	pub fn channel(&self) -> &str {
		&self.channel
	}

	/// Bound component event, if any.
	pub fn bind(&self) -> Option<&str> {
		self.bind.as_deref()
	}
}

/// Ledger of one component's channel subscriptions and publications.
pub struct Subscriptor {
	node: ComponentId,
	subscriptions: Vec<SubscriptionRecord>,
	publications: Vec<Publication>,
	node_channel_data: Ledger,
}

impl fmt::Debug for Subscriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscriptor")
			.field("node", &self.node)
			.field("subscriptions", &self.subscriptions)
			.field("publications", &self.publications)
			.field("node_channel_data", &self.node_channel_data.borrow())
			.finish()
	}
}

impl Subscriptor {
	/// Creates an empty ledger for `node`.
	pub fn new(node: ComponentId) -> Self {
		Self {
			node,
			subscriptions: Vec::new(),
			publications: Vec::new(),
			node_channel_data: Rc::new(RefCell::new(HashMap::new())),
		}
	}

	/// The owning component.
	pub fn node(&self) -> ComponentId {
		self.node
	}

	/// Subscribes the component to `channel`.
	///
	/// At most one live subscription exists per (component, channel): if the
	/// component is already subscribed, nothing happens, the original callback
	/// is kept, and `false` is returned.
	///
	/// With `previous_state == false` the callback is wrapped for no-replay
	/// delivery (see the module docs). With `previous_state == true` every
	/// delivery reaches the callback, including the replay on subscribe.
	pub fn subscribe<T, F>(
		&mut self,
		channel: &Channel<T>,
		callback: F,
		previous_state: bool,
		bind: Option<String>,
	) -> bool
	where
		T: Clone + 'static,
		F: Fn(&Envelope<T>) + 'static,
	{
		if self.has_subscription(channel) {
			tracing::debug!(
				channel = %channel.name(),
				node = ?self.node,
				"already subscribed; keeping original callback"
			);
			return false;
		}

		let handle = if previous_state {
			channel.subscribe(callback)
		} else {
			let ledger = Rc::clone(&self.node_channel_data);
			let name = channel.name().to_string();
			channel.subscribe(move |envelope: &Envelope<T>| {
				if observe(&ledger, &name, envelope) {
					callback(envelope);
				}
			})
		};

		self.subscriptions.push(SubscriptionRecord {
			channel_id: channel.id(),
			channel_name: channel.name().to_string(),
			bind,
			node: self.node,
			handle,
		});
		true
	}

	/// Records an outbound binding for later teardown.
	pub fn publish(&mut self, publication: Publication) {
		self.publications.push(publication);
	}

	/// Returns `true` if the component holds a subscription to this exact channel.
	pub fn has_subscription<T: Clone + 'static>(&self, channel: &Channel<T>) -> bool {
		let id = channel.id();
		self.subscriptions
			.iter()
			.any(|record| record.channel_id == id)
	}

	/// Tears down subscriptions and publications.
	///
	/// Subscriptions to private channels survive unless
	/// `clean_private_channels` is `true`. Publications are always torn down.
	pub fn unsubscribe(&mut self, clean_private_channels: bool) {
		let before = self.subscriptions.len();
		self.subscriptions.retain(|record| {
			if !clean_private_channels && is_private_channel(&record.channel_name) {
				return true;
			}
			record.handle.unsubscribe();
			false
		});

		let publications = self.publications.len();
		for publication in self.publications.drain(..) {
			if let Some(teardown) = publication.teardown {
				teardown();
			}
		}

		tracing::debug!(
			node = ?self.node,
			subscriptions = before - self.subscriptions.len(),
			publications,
			"torn down component bindings"
		);
	}

	/// Live subscriptions, in subscription order.
	pub fn subscriptions(&self) -> &[SubscriptionRecord] {
		&self.subscriptions
	}

	/// Recorded publications.
	pub fn publications(&self) -> &[Publication] {
		&self.publications
	}

	/// Stamp of the last value observed on `channel` in no-replay mode.
	pub fn observed(&self, channel: &str) -> Option<ObservedStamp> {
		self.node_channel_data.borrow().get(channel).copied()
	}
}

/// Records the delivered stamp and decides whether the callback should run.
fn observe<T>(ledger: &RefCell<HashMap<String, ObservedStamp>>, channel: &str, envelope: &Envelope<T>) -> bool {
	let mut ledger = ledger.borrow_mut();
	let seen = ledger.get(channel).copied();

	let deliver = match seen {
		None => true,
		Some(seen) => {
			envelope.timestamp > seen.timestamp
				|| (envelope.timestamp == seen.timestamp
					&& seen.id.is_some_and(|id| id != envelope.id))
		}
	};

	ledger.insert(
		channel.to_string(),
		ObservedStamp {
			timestamp: envelope.timestamp,
			id: Some(envelope.id),
		},
	);
	deliver
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn counter() -> (Rc<Cell<usize>>, impl Fn(&Envelope<i32>) + 'static) {
		let calls = Rc::new(Cell::new(0));
		let sink = Rc::clone(&calls);
		(calls, move |_: &Envelope<i32>| sink.set(sink.get() + 1))
	}

	fn ledger_with(channel: &str, timestamp: i64, id: Option<Uuid>) -> RefCell<HashMap<String, ObservedStamp>> {
		let mut map = HashMap::new();
		map.insert(channel.to_string(), ObservedStamp { timestamp, id });
		RefCell::new(map)
	}

	#[rstest]
	fn test_observe_first_value_fires() {
		let ledger = RefCell::new(HashMap::new());
		let envelope = Envelope::with_stamp(1, Uuid::new_v4(), 10);

		assert!(observe(&ledger, "c", &envelope));
		assert_eq!(
			ledger.borrow().get("c").copied(),
			Some(ObservedStamp {
				timestamp: 10,
				id: Some(envelope.id)
			})
		);
	}

	#[rstest]
	#[case::newer(11, false, true)]
	#[case::same_time_other_id(10, false, true)]
	#[case::same_time_same_id(10, true, false)]
	#[case::older(9, false, false)]
	fn test_observe_tie_breaking(#[case] timestamp: i64, #[case] same_id: bool, #[case] fires: bool) {
		// Arrange
		let seen_id = Uuid::new_v4();
		let ledger = ledger_with("c", 10, Some(seen_id));
		let id = if same_id { seen_id } else { Uuid::new_v4() };

		// Act
		let delivered = observe(&ledger, "c", &Envelope::with_stamp(1, id, timestamp));

		// Assert
		assert_eq!(delivered, fires);
	}

	#[rstest]
	fn test_observe_same_time_unknown_id_does_not_fire() {
		let ledger = ledger_with("c", 10, None);

		assert!(!observe(&ledger, "c", &Envelope::with_stamp(1, Uuid::new_v4(), 10)));
	}

	#[rstest]
	fn test_observe_advances_even_when_suppressed() {
		let id = Uuid::new_v4();
		let ledger = ledger_with("c", 10, None);

		assert!(!observe(&ledger, "c", &Envelope::with_stamp(1, id, 10)));
		assert_eq!(ledger.borrow().get("c").and_then(|s| s.id), Some(id));
	}

	#[rstest]
	fn test_observe_records_older_stamp_without_firing() {
		// Arrange
		let ledger = ledger_with("c", 10, Some(Uuid::new_v4()));
		let id = Uuid::new_v4();

		// Act
		let delivered = observe(&ledger, "c", &Envelope::with_stamp(1, id, 5));

		// Assert: the ledger follows the channel's current stamp
		assert!(!delivered);
		assert_eq!(
			ledger.borrow().get("c").copied(),
			Some(ObservedStamp {
				timestamp: 5,
				id: Some(id)
			})
		);
		assert!(observe(&ledger, "c", &Envelope::with_stamp(2, Uuid::new_v4(), 6)));
	}

	#[rstest]
	fn test_subscribe_once_per_channel() {
		// Arrange
		let channel = Channel::<i32>::new("cart");
		let mut subscriptor = Subscriptor::new(ComponentId::from_raw(1));
		let (first_calls, first) = counter();
		let (second_calls, second) = counter();

		// Act
		assert!(subscriptor.subscribe(&channel, first, false, None));
		assert!(!subscriptor.subscribe(&channel, second, false, None));
		channel.next(1);

		// Assert
		assert_eq!(first_calls.get(), 1);
		assert_eq!(second_calls.get(), 0);
		assert_eq!(channel.observer_count(), 1);
		assert!(subscriptor.has_subscription(&channel));
	}

	#[rstest]
	fn test_resubscribe_does_not_replay_seen_value() {
		// Arrange
		let channel = Channel::<i32>::new("cart");
		let mut subscriptor = Subscriptor::new(ComponentId::from_raw(1));
		let (calls, callback) = counter();
		channel.next(1);
		subscriptor.subscribe(&channel, callback, false, None);
		assert_eq!(calls.get(), 1);

		// Act
		subscriptor.unsubscribe(false);
		let (again_calls, again) = counter();
		subscriptor.subscribe(&channel, again, false, None);

		// Assert
		assert_eq!(again_calls.get(), 0);
		channel.next(2);
		assert_eq!(again_calls.get(), 1);
	}

	#[rstest]
	fn test_previous_state_always_delivers() {
		let channel = Channel::<i32>::new("cart");
		let mut subscriptor = Subscriptor::new(ComponentId::from_raw(1));
		let (calls, callback) = counter();
		channel.next(1);
		subscriptor.subscribe(&channel, callback, true, None);
		subscriptor.unsubscribe(false);
		let (again_calls, again) = counter();

		subscriptor.subscribe(&channel, again, true, None);

		assert_eq!(calls.get(), 1);
		assert_eq!(again_calls.get(), 1);
	}

	#[rstest]
	fn test_unsubscribe_keeps_private_channels_by_default() {
		// Arrange
		let public = Channel::<i32>::new("cart");
		let private = Channel::<i32>::new("__bridge_page_home");
		let mut subscriptor = Subscriptor::new(ComponentId::from_raw(1));
		subscriptor.subscribe(&public, |_| {}, false, Some("items".to_string()));
		subscriptor.subscribe(&private, |_| {}, false, None);

		// Act
		subscriptor.unsubscribe(false);

		// Assert
		assert_eq!(public.observer_count(), 0);
		assert_eq!(private.observer_count(), 1);
		assert_eq!(subscriptor.subscriptions().len(), 1);
		assert_eq!(
			subscriptor.subscriptions()[0].channel_name(),
			"__bridge_page_home"
		);

		subscriptor.unsubscribe(true);
		assert_eq!(private.observer_count(), 0);
		assert!(subscriptor.subscriptions().is_empty());
	}

	#[rstest]
	fn test_unsubscribe_always_tears_down_publications() {
		// Arrange
		let released = Rc::new(Cell::new(false));
		let flag = Rc::clone(&released);
		let mut subscriptor = Subscriptor::new(ComponentId::from_raw(1));
		subscriptor.publish(
			Publication::new("__bridge_app")
				.with_bind("on-login")
				.with_teardown(move || flag.set(true)),
		);
		assert_eq!(subscriptor.publications()[0].bind(), Some("on-login"));

		// Act
		subscriptor.unsubscribe(false);

		// Assert
		assert!(released.get());
		assert!(subscriptor.publications().is_empty());
	}

	#[rstest]
	fn test_record_exposes_binding() {
		let channel = Channel::<i32>::new("cart");
		let node = ComponentId::from_raw(9);
		let mut subscriptor = Subscriptor::new(node);

		subscriptor.subscribe(&channel, |_| {}, false, Some("items".to_string()));

		let record = &subscriptor.subscriptions()[0];
		assert_eq!(record.bind(), Some("items"));
		assert_eq!(record.node(), node);
		assert!(record.handle().is_active());
	}
}
