//! Stamped channel values.
//!
//! Every value that travels through a [`Channel`](crate::Channel) is wrapped
//! in an [`Envelope`] carrying a unique id and a millisecond timestamp. The
//! stamp is what lets a [`Subscriptor`](crate::Subscriptor) tell a value it has
//! already acted on apart from a genuinely new one without comparing payloads.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Highest timestamp handed out so far. Keeps stamps non-decreasing even if
/// the wall clock steps backwards.
static LAST_STAMP: AtomicI64 = AtomicI64::new(i64::MIN);

/// Returns the current time in milliseconds, never lower than a previously
/// returned value.
pub(crate) fn now_millis() -> i64 {
	let now = Utc::now().timestamp_millis();
	let previous = LAST_STAMP.fetch_max(now, Ordering::AcqRel);
	previous.max(now)
}

/// A payload stamped with a unique id and a publication time.
///
/// A bare payload converts into a freshly stamped envelope, so
/// `channel.next(value)` always stamps. Passing an existing envelope keeps its
/// stamp, which is how a value is republished "as is".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
	/// Unique id (random v4 UUID).
	pub id: Uuid,
	/// Publication time in milliseconds since the Unix epoch.
	pub timestamp: i64,
	/// The published value.
	pub payload: T,
}

impl<T> Envelope<T> {
	/// Wraps `payload` with a fresh id and the current time.
	pub fn new(payload: T) -> Self {
		Self {
			id: Uuid::new_v4(),
			timestamp: now_millis(),
			payload,
		}
	}

	/// Wraps `payload` with an explicit stamp.
	pub fn with_stamp(payload: T, id: Uuid, timestamp: i64) -> Self {
		Self {
			id,
			timestamp,
			payload,
		}
	}

	/// Returns `true` if both envelopes carry the same id and timestamp.
	pub fn same_stamp<U>(&self, other: &Envelope<U>) -> bool {
		self.id == other.id && self.timestamp == other.timestamp
	}

	/// Consumes the envelope and returns the payload.
	pub fn into_payload(self) -> T {
		self.payload
	}
}

impl<T> From<T> for Envelope<T> {
	fn from(payload: T) -> Self {
		Self::new(payload)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_fresh_envelopes_have_distinct_ids() {
		// Act
		let first = Envelope::new(1);
		let second = Envelope::new(1);

		// Assert
		assert_ne!(first.id, second.id);
		assert!(second.timestamp >= first.timestamp);
		assert!(!first.same_stamp(&second));
	}

	#[rstest]
	fn test_explicit_stamp_is_kept() {
		// Arrange
		let id = Uuid::new_v4();

		// Act
		let envelope: Envelope<&str> = Envelope::with_stamp("cart", id, 42);
		let converted: Envelope<&str> = envelope.clone().into();

		// Assert
		assert_eq!(converted.id, id);
		assert_eq!(converted.timestamp, 42);
		assert!(converted.same_stamp(&envelope));
	}

	#[rstest]
	fn test_stamps_never_decrease() {
		let mut previous = now_millis();
		for _ in 0..100 {
			let current = now_millis();
			assert!(current >= previous);
			previous = current;
		}
	}
}
