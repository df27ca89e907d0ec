//! # portico-channels
//!
//! Named, replay-last-value broadcast channels and the per-component ledger
//! that keeps deliveries idempotent.
//!
//! ## Overview
//!
//! - [`Channel`]: a named broadcast with a one-slot replay buffer. Every value
//!   is wrapped in an [`Envelope`] stamped with a UUID and a millisecond
//!   timestamp.
//! - [`ChannelManager`]: the name-keyed registry channels are obtained from.
//! - [`Subscriptor`]: one component's subscriptions and publications, with
//!   no-replay delivery.
//! - [`ComponentConnector`]: component identity to subscriptor registry.
//!
//! Channels whose name starts with [`PRIVATE_CHANNEL_PREFIX`] belong to the
//! runtime: ordinary writes to them are logged and dropped.
//!
//! ## Example
//!
//! ```
//! use portico_channels::{ChannelManager, ComponentConnector, ComponentId};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let manager = ChannelManager::new();
//! let mut connector = ComponentConnector::new();
//! let badge = ComponentId::new();
//!
//! manager.publish::<u32>("cart", 2);
//!
//! let seen = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&seen);
//! let cart = manager.get::<u32>("cart");
//! connector.subscribe(badge, &cart, move |e| sink.set(e.payload), false, None);
//!
//! // The late subscriber received the last value immediately.
//! assert_eq!(seen.get(), 2);
//! ```
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); channels are not
//! `Send`.

pub mod channel;
pub mod connector;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod subscriptor;

pub use channel::{
	Channel, ChannelId, PRIVATE_CHANNEL_PREFIX, SubscriberId, Subscription, is_private_channel,
};
pub use connector::{ComponentConnector, ComponentId};
pub use envelope::Envelope;
pub use error::{ChannelError, ChannelResult};
pub use manager::ChannelManager;
pub use subscriptor::{ObservedStamp, Publication, SubscriptionRecord, Subscriptor};
