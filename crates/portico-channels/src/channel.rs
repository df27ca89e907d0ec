//! Channel - named broadcast with a one-slot replay buffer.
//!
//! A [`Channel`] keeps the most recently published [`Envelope`] and hands it
//! to every subscriber, including subscribers that attach after the value was
//! published. Delivery is synchronous: `next` returns only after every
//! currently attached subscriber ran, in subscription order.
//!
//! ```text
//! next(v) ──► stamp ──► replay slot ──► subscriber #1
//!                                   ├─► subscriber #2
//!                                   └─► subscriber #N
//! subscribe(cb) ──► cb(replay slot)   (if a value was published)
//! ```
//!
//! Channels are single-threaded: clones share state through `Rc<RefCell<_>>`
//! the same way reactive signals do.

use crate::envelope::Envelope;
use crate::error::{ChannelError, ChannelResult};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix reserved for channels owned by the runtime itself.
pub const PRIVATE_CHANNEL_PREFIX: &str = "__bridge_";

/// Returns `true` if `name` designates a private (runtime-owned) channel.
pub fn is_private_channel(name: &str) -> bool {
	name.starts_with(PRIVATE_CHANNEL_PREFIX)
}

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a channel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
	fn next() -> Self {
		Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Identity of one subscriber attached to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
	fn next() -> Self {
		Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
	}
}

pub(crate) type Callback<T> = Rc<dyn Fn(&Envelope<T>)>;

struct ChannelState<T> {
	last: Option<Envelope<T>>,
	subscribers: Vec<(SubscriberId, Callback<T>)>,
	closed: bool,
}

pub(crate) struct ChannelInner<T> {
	id: ChannelId,
	name: String,
	state: RefCell<ChannelState<T>>,
}

/// Removal of a subscriber without knowing the channel's value type.
trait Detach {
	fn detach(&self, subscriber: SubscriberId) -> bool;
	fn is_attached(&self, subscriber: SubscriberId) -> bool;
}

impl<T> Detach for ChannelInner<T> {
	fn detach(&self, subscriber: SubscriberId) -> bool {
		let mut state = self.state.borrow_mut();
		let before = state.subscribers.len();
		state.subscribers.retain(|(id, _)| *id != subscriber);
		before != state.subscribers.len()
	}

	fn is_attached(&self, subscriber: SubscriberId) -> bool {
		self.state
			.borrow()
			.subscribers
			.iter()
			.any(|(id, _)| *id == subscriber)
	}
}

/// A named, replay-last-value broadcast primitive.
///
/// Cloning a channel yields another handle to the same channel.
pub struct Channel<T: 'static> {
	inner: Rc<ChannelInner<T>>,
}

impl<T: 'static> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static> fmt::Debug for Channel<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.borrow();
		f.debug_struct("Channel")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.field("observers", &state.subscribers.len())
			.field("has_value", &state.last.is_some())
			.field("closed", &state.closed)
			.finish()
	}
}

impl<T: Clone + 'static> Channel<T> {
	/// Creates an empty, open channel.
	///
	/// Prefer [`ChannelManager::get`](crate::ChannelManager::get), which is the
	/// sanctioned way to obtain shared channels by name.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			inner: Rc::new(ChannelInner {
				id: ChannelId::next(),
				name: name.into(),
				state: RefCell::new(ChannelState {
					last: None,
					subscribers: Vec::new(),
					closed: false,
				}),
			}),
		}
	}

	/// Returns the channel identity.
	pub fn id(&self) -> ChannelId {
		self.inner.id
	}

	/// Returns the channel name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Returns `true` for runtime-owned channels (see [`PRIVATE_CHANNEL_PREFIX`]).
	pub fn is_private(&self) -> bool {
		is_private_channel(&self.inner.name)
	}

	/// Returns `true` if both handles point at the same channel.
	pub fn same_channel(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Publishes a value to every subscriber and keeps it for late subscribers.
	///
	/// A bare value is stamped with a fresh id and the current time; an
	/// [`Envelope`] keeps its stamp. Writes to private channels are rejected:
	/// the value is logged and dropped, and `false` is returned.
	pub fn next(&self, value: impl Into<Envelope<T>>) -> bool {
		if self.is_private() {
			tracing::warn!(
				channel = %self.inner.name,
				"rejected write to private channel"
			);
			return false;
		}
		self.emit(value)
	}

	/// Publishes without the private-channel guard.
	///
	/// Reserved for the runtime publishing onto its own channels.
	#[doc(hidden)]
	pub fn emit(&self, value: impl Into<Envelope<T>>) -> bool {
		let envelope = value.into();
		let subscribers: Vec<Callback<T>> = {
			let mut state = self.inner.state.borrow_mut();
			if state.closed {
				tracing::warn!(channel = %self.inner.name, "dropped write to closed channel");
				return false;
			}
			state.last = Some(envelope.clone());
			state
				.subscribers
				.iter()
				.map(|(_, callback)| Rc::clone(callback))
				.collect()
		};

		// The borrow is released so callbacks may publish or subscribe again.
		for callback in subscribers {
			callback(&envelope);
		}
		true
	}

	/// Attaches a subscriber.
	///
	/// If a value was already published, the callback runs immediately with
	/// it before this method returns.
	pub fn subscribe<F>(&self, callback: F) -> Subscription
	where
		F: Fn(&Envelope<T>) + 'static,
	{
		let id = SubscriberId::next();
		let callback: Callback<T> = Rc::new(callback);
		let replay = {
			let mut state = self.inner.state.borrow_mut();
			if state.closed {
				tracing::debug!(channel = %self.inner.name, "subscribed to closed channel");
			} else {
				state.subscribers.push((id, Rc::clone(&callback)));
			}
			state.last.clone()
		};

		if let Some(envelope) = replay {
			callback(&envelope);
		}

		let source: Rc<dyn Detach> = self.inner.clone();
		Subscription {
			id,
			channel_id: self.inner.id,
			channel_name: self.inner.name.clone(),
			source: Rc::downgrade(&source),
		}
	}

	/// Returns a copy of the replay buffer.
	pub fn last(&self) -> Option<Envelope<T>> {
		self.inner.state.borrow().last.clone()
	}

	/// Empties the replay buffer and drops every subscriber.
	///
	/// The channel stays open and usable.
	pub fn clean(&self) {
		let mut state = self.inner.state.borrow_mut();
		state.last = None;
		state.subscribers.clear();
	}

	/// Permanently closes the channel.
	pub fn complete(&self) {
		let mut state = self.inner.state.borrow_mut();
		state.closed = true;
		state.subscribers.clear();
	}

	/// Returns `true` once [`complete`](Self::complete) was called.
	pub fn is_closed(&self) -> bool {
		self.inner.state.borrow().closed
	}

	/// Reports whether at least one subscriber is attached.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::IllegalState`] if the channel was closed.
	pub fn has_observers(&self) -> ChannelResult<bool> {
		let state = self.inner.state.borrow();
		if state.closed {
			return Err(ChannelError::IllegalState {
				channel: self.inner.name.clone(),
			});
		}
		Ok(!state.subscribers.is_empty())
	}

	/// Returns the number of attached subscribers.
	pub fn observer_count(&self) -> usize {
		self.inner.state.borrow().subscribers.len()
	}
}

/// Handle to one subscriber attached to a channel.
///
/// Dropping the handle does not detach the subscriber; call
/// [`unsubscribe`](Self::unsubscribe).
pub struct Subscription {
	id: SubscriberId,
	channel_id: ChannelId,
	channel_name: String,
	source: Weak<dyn Detach>,
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("channel_id", &self.channel_id)
			.field("channel_name", &self.channel_name)
			.field("active", &self.is_active())
			.finish()
	}
}

impl Subscription {
	/// Returns the subscriber id.
	pub fn id(&self) -> SubscriberId {
		self.id
	}

	/// Returns the identity of the channel this subscription belongs to.
	pub fn channel_id(&self) -> ChannelId {
		self.channel_id
	}

	/// Returns the name of the channel this subscription belongs to.
	pub fn channel_name(&self) -> &str {
		&self.channel_name
	}

	/// Detaches the subscriber. Returns `false` if it was already detached.
	pub fn unsubscribe(&self) -> bool {
		self.source
			.upgrade()
			.is_some_and(|source| source.detach(self.id))
	}

	/// Returns `true` while the subscriber is still attached.
	pub fn is_active(&self) -> bool {
		self.source
			.upgrade()
			.is_some_and(|source| source.is_attached(self.id))
	}
}

/// Type-erased view used by the channel registry.
pub(crate) trait ErasedChannel {
	fn name(&self) -> &str;
	fn clean(&self);
	fn as_any(&self) -> &dyn Any;
}

impl<T: Clone + 'static> ErasedChannel for Channel<T> {
	fn name(&self) -> &str {
		Channel::name(self)
	}

	fn clean(&self) {
		Channel::clean(self);
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&Envelope<T>) + 'static) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		(seen, move |envelope: &Envelope<T>| {
			sink.borrow_mut().push(envelope.payload.clone())
		})
	}

	#[rstest]
	fn test_next_delivers_to_current_subscribers() {
		// Arrange
		let channel = Channel::<i32>::new("counter");
		let (seen, callback) = recorder();
		channel.subscribe(callback);

		// Act
		channel.next(1);
		channel.next(2);

		// Assert
		assert_eq!(*seen.borrow(), vec![1, 2]);
	}

	#[rstest]
	fn test_late_subscriber_receives_last_value_once() {
		// Arrange
		let channel = Channel::<&str>::new("user");
		channel.next("anna");
		channel.next("bob");
		let (seen, callback) = recorder();

		// Act
		channel.subscribe(callback);

		// Assert
		assert_eq!(*seen.borrow(), vec!["bob"]);
	}

	#[rstest]
	fn test_next_stamps_bare_values() {
		let channel = Channel::<u8>::new("stamps");

		channel.next(7);
		let first = channel.last().unwrap();
		channel.next(7);
		let second = channel.last().unwrap();

		assert_ne!(first.id, second.id);
		assert!(second.timestamp >= first.timestamp);
	}

	#[rstest]
	fn test_next_keeps_existing_stamp() {
		let channel = Channel::<u8>::new("stamps");
		let envelope = Envelope::new(7);

		channel.next(envelope.clone());

		assert!(channel.last().unwrap().same_stamp(&envelope));
	}

	#[rstest]
	fn test_subscribers_run_in_subscription_order() {
		let channel = Channel::<()>::new("order");
		let order = Rc::new(RefCell::new(Vec::new()));
		for index in 0..3 {
			let order = Rc::clone(&order);
			channel.subscribe(move |_| order.borrow_mut().push(index));
		}

		channel.next(());

		assert_eq!(*order.borrow(), vec![0, 1, 2]);
	}

	#[rstest]
	fn test_unsubscribe_detaches() {
		// Arrange
		let channel = Channel::<i32>::new("counter");
		let (seen, callback) = recorder();
		let subscription = channel.subscribe(callback);

		// Act
		assert!(subscription.unsubscribe());
		channel.next(1);

		// Assert
		assert!(seen.borrow().is_empty());
		assert!(!subscription.is_active());
		assert!(!subscription.unsubscribe());
	}

	#[rstest]
	fn test_clean_drops_value_and_subscribers_but_stays_open() {
		// Arrange
		let channel = Channel::<i32>::new("counter");
		let (seen, callback) = recorder();
		channel.subscribe(callback);
		channel.next(1);

		// Act
		channel.clean();

		// Assert
		assert!(channel.last().is_none());
		assert_eq!(channel.has_observers(), Ok(false));
		assert!(channel.next(2));
		assert_eq!(*seen.borrow(), vec![1]);
		assert_eq!(channel.last().map(|e| e.payload), Some(2));
	}

	#[rstest]
	fn test_has_observers_on_closed_channel_is_illegal() {
		let channel = Channel::<i32>::new("closing");
		channel.subscribe(|_| {});
		assert_eq!(channel.has_observers(), Ok(true));

		channel.complete();

		assert_eq!(
			channel.has_observers(),
			Err(ChannelError::IllegalState {
				channel: "closing".to_string()
			})
		);
		assert!(!channel.next(1));
	}

	#[rstest]
	fn test_private_channel_rejects_public_writes() {
		// Arrange
		let channel = Channel::<bool>::new("__bridge_page_home");
		let calls = Rc::new(Cell::new(0));
		let counter = Rc::clone(&calls);
		channel.subscribe(move |_| counter.set(counter.get() + 1));

		// Act
		let accepted = channel.next(true);

		// Assert
		assert!(!accepted);
		assert_eq!(calls.get(), 0);
		assert!(channel.last().is_none());

		// The runtime itself may still write.
		assert!(channel.emit(true));
		assert_eq!(calls.get(), 1);
	}

	#[rstest]
	fn test_reentrant_publish_from_callback() {
		// Arrange
		let channel = Channel::<i32>::new("echo");
		let (seen, callback) = recorder();
		let echo = channel.clone();
		channel.subscribe(move |envelope| {
			if envelope.payload < 3 {
				echo.next(envelope.payload + 1);
			}
		});
		channel.subscribe(callback);

		// Act
		channel.next(1);

		// Assert
		assert_eq!(channel.last().map(|e| e.payload), Some(3));
		assert_eq!(*seen.borrow(), vec![3, 2, 1]);
	}

	#[rstest]
	fn test_clones_share_state() {
		let channel = Channel::<i32>::new("shared");
		let clone = channel.clone();

		clone.next(5);

		assert!(channel.same_channel(&clone));
		assert_eq!(channel.last().map(|e| e.payload), Some(5));
		assert!(!channel.same_channel(&Channel::new("shared")));
	}

	#[rstest]
	#[case("__bridge_app", true)]
	#[case("__bridge_page_home", true)]
	#[case("bridge_app", false)]
	#[case("cart", false)]
	fn test_is_private_channel(#[case] name: &str, #[case] expected: bool) {
		assert_eq!(is_private_channel(name), expected);
	}
}
