//! Channel error types.

use thiserror::Error;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors raised by misuse of the channel protocol.
///
/// Forbidden writes to private channels are not errors: they are logged and
/// dropped at the call site. Only protocol violations that indicate a
/// programming mistake surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ChannelError {
	/// The channel was permanently closed with [`Channel::complete`](crate::Channel::complete)
	/// and can no longer be inspected.
	#[error("illegal state: channel '{channel}' is closed")]
	IllegalState {
		/// Name of the closed channel.
		channel: String,
	},
}

impl ChannelError {
	/// Returns a short stable label for logs.
	pub fn as_label(&self) -> &'static str {
		match self {
			Self::IllegalState { .. } => "channel_illegal_state",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_illegal_state_display() {
		let err = ChannelError::IllegalState {
			channel: "cart".to_string(),
		};

		assert_eq!(err.to_string(), "illegal state: channel 'cart' is closed");
		assert_eq!(err.as_label(), "channel_illegal_state");
	}
}
