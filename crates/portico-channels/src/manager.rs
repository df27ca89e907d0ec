//! Name-keyed channel registry.
//!
//! [`ChannelManager`] owns every [`Channel`] of an application. Channels are
//! created lazily the first time they are referenced and stay registered for
//! the lifetime of the manager; [`clean_all_channels`](ChannelManager::clean_all_channels)
//! empties them without unregistering, so handles held elsewhere stay valid.

use crate::channel::{Channel, ErasedChannel, is_private_channel};
use crate::envelope::Envelope;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type ChannelKey = (TypeId, String);

/// Registry of named channels.
///
/// Channels are keyed by name and value type, so the same name used with two
/// different payload types yields two independent channels. Cloning the
/// manager yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ChannelManager {
	channels: Rc<RefCell<HashMap<ChannelKey, Box<dyn ErasedChannel>>>>,
}

impl fmt::Debug for ChannelManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChannelManager")
			.field("channels", &self.names())
			.finish()
	}
}

impl ChannelManager {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the channel registered under `name`, creating it on a miss.
	pub fn get<T: Clone + 'static>(&self, name: &str) -> Channel<T> {
		if let Some(channel) = self.get_unsafe::<T>(name) {
			return channel;
		}

		let channel = Channel::<T>::new(name);
		tracing::debug!(channel = %name, "created channel");
		self.channels
			.borrow_mut()
			.insert((TypeId::of::<T>(), name.to_string()), Box::new(channel.clone()));
		channel
	}

	/// Returns the channel registered under `name` without creating it.
	pub fn get_unsafe<T: Clone + 'static>(&self, name: &str) -> Option<Channel<T>> {
		let channels = self.channels.borrow();
		channels
			.get(&(TypeId::of::<T>(), name.to_string()))
			.and_then(|channel| channel.as_any().downcast_ref::<Channel<T>>())
			.cloned()
	}

	/// Publishes `value` on the channel named `name`.
	///
	/// Writes to private channels are rejected: they are logged and dropped,
	/// and `false` is returned.
	pub fn publish<T: Clone + 'static>(&self, name: &str, value: impl Into<Envelope<T>>) -> bool {
		if is_private_channel(name) {
			tracing::warn!(channel = %name, "rejected publish to private channel");
			return false;
		}
		self.get::<T>(name).next(value)
	}

	/// Publishes without the private-channel guard.
	#[doc(hidden)]
	pub fn publish_internal<T: Clone + 'static>(
		&self,
		name: &str,
		value: impl Into<Envelope<T>>,
	) -> bool {
		self.get::<T>(name).emit(value)
	}

	/// Returns `true` if a channel with this name exists, whatever its type.
	pub fn contains(&self, name: &str) -> bool {
		self.channels
			.borrow()
			.keys()
			.any(|(_, channel)| channel == name)
	}

	/// Returns the names of all registered channels, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.channels
			.borrow()
			.values()
			.map(|channel| channel.name().to_string())
			.collect();
		names.sort();
		names.dedup();
		names
	}

	/// Returns the number of registered channels.
	pub fn len(&self) -> usize {
		self.channels.borrow().len()
	}

	/// Returns `true` if no channel was created yet.
	pub fn is_empty(&self) -> bool {
		self.channels.borrow().is_empty()
	}

	/// Cleans every registered channel (replay buffer and subscribers).
	///
	/// Channels stay registered; previously obtained handles remain valid but
	/// empty.
	pub fn clean_all_channels(&self) {
		let channels = self.channels.borrow();
		for channel in channels.values() {
			channel.clean();
		}
		tracing::debug!(count = channels.len(), "cleaned all channels");
	}
}
