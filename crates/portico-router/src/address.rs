//! Address-bar access and routing strategies.
//!
//! The router never touches a browser directly. It reads and writes the
//! address through an [`AddressBar`], and an [`AddressStrategy`] decides how
//! a route path is written into it:
//!
//! - hash routing: `#!/categories/service`
//! - History-API routing: `/categories/service`

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Default prefix for hash routing.
pub const DEFAULT_HASH_PREFIX: &str = "#!";

/// Host address bar.
///
/// Implementations for a browser would wrap `location.hash` or
/// `history.pushState`; [`MemoryAddressBar`] serves tests and non-browser
/// hosts.
pub trait AddressBar {
	/// Returns the current address (the hash including `#`, or the path).
	fn read(&self) -> String;

	/// Writes a new history entry.
	fn push(&self, address: &str);

	/// Overwrites the current history entry.
	fn replace(&self, address: &str);

	/// Whether `pushState`/`replaceState` style updates are available.
	fn supports_history_api(&self) -> bool {
		true
	}
}

/// How route paths are written into the address bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressStrategy {
	/// `location.hash = prefix + path`.
	Hash {
		/// Prefix in front of the path, `#!` by default.
		prefix: String,
	},
	/// `pushState`/`replaceState` with the bare path.
	History,
}

impl Default for AddressStrategy {
	fn default() -> Self {
		Self::Hash {
			prefix: DEFAULT_HASH_PREFIX.to_string(),
		}
	}
}

impl AddressStrategy {
	/// Picks the strategy for a host.
	///
	/// History routing is only used when requested and supported; otherwise
	/// hash routing with `hash_prefix` is used.
	pub fn select(use_history: bool, hash_prefix: &str, bar: &dyn AddressBar) -> Self {
		if use_history {
			if bar.supports_history_api() {
				return Self::History;
			}
			tracing::warn!("history API unavailable, falling back to hash routing");
		}
		Self::Hash {
			prefix: hash_prefix.to_string(),
		}
	}

	/// Turns a route path into an address.
	pub fn format(&self, path: &str) -> String {
		match self {
			Self::Hash { prefix } => format!("{}{}", prefix, path),
			Self::History => path.to_string(),
		}
	}

	/// Turns an address back into a route path (`?query` included).
	pub fn parse(&self, address: &str) -> String {
		let path = match self {
			Self::Hash { prefix } => address
				.strip_prefix(prefix.as_str())
				.or_else(|| address.strip_prefix('#'))
				.unwrap_or(address),
			Self::History => address,
		};
		if path.is_empty() {
			"/".to_string()
		} else if path.starts_with('/') {
			path.to_string()
		} else {
			format!("/{}", path)
		}
	}

	pub fn is_history(&self) -> bool {
		matches!(self, Self::History)
	}
}

#[derive(Debug)]
struct MemoryState {
	entries: Vec<String>,
	cursor: usize,
	history_api: bool,
	writes: usize,
}

/// In-memory address bar with a browsable history.
///
/// Clones share the same history, so a test can hand one clone to the
/// router and keep another to simulate back and forward gestures.
#[derive(Clone)]
pub struct MemoryAddressBar {
	state: Rc<RefCell<MemoryState>>,
}

impl fmt::Debug for MemoryAddressBar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("MemoryAddressBar")
			.field("current", &state.entries.get(state.cursor))
			.field("entries", &state.entries.len())
			.finish()
	}
}

impl Default for MemoryAddressBar {
	fn default() -> Self {
		Self::new("")
	}
}

impl MemoryAddressBar {
	/// Creates a bar showing `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			state: Rc::new(RefCell::new(MemoryState {
				entries: vec![initial.into()],
				cursor: 0,
				history_api: true,
				writes: 0,
			})),
		}
	}

	/// Creates a bar whose host lacks the History API.
	pub fn without_history_api(initial: impl Into<String>) -> Self {
		let bar = Self::new(initial);
		bar.state.borrow_mut().history_api = false;
		bar
	}

	/// Simulates the user typing an address (a new entry).
	pub fn type_address(&self, address: impl Into<String>) {
		self.push(&address.into());
	}

	/// Simulates the browser back button. Returns `false` at the oldest entry.
	pub fn back(&self) -> bool {
		let mut state = self.state.borrow_mut();
		if state.cursor == 0 {
			return false;
		}
		state.cursor -= 1;
		true
	}

	/// Simulates the browser forward button. Returns `false` at the newest entry.
	pub fn forward(&self) -> bool {
		let mut state = self.state.borrow_mut();
		if state.cursor + 1 >= state.entries.len() {
			return false;
		}
		state.cursor += 1;
		true
	}

	/// All entries, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.state.borrow().entries.clone()
	}

	/// Number of `push`/`replace` calls so far.
	pub fn writes(&self) -> usize {
		self.state.borrow().writes
	}
}

impl AddressBar for MemoryAddressBar {
	fn read(&self) -> String {
		let state = self.state.borrow();
		state.entries.get(state.cursor).cloned().unwrap_or_default()
	}

	fn push(&self, address: &str) {
		let mut state = self.state.borrow_mut();
		let keep = state.cursor + 1;
		state.entries.truncate(keep);
		state.entries.push(address.to_string());
		state.cursor = state.entries.len() - 1;
		state.writes += 1;
	}

	fn replace(&self, address: &str) {
		let mut state = self.state.borrow_mut();
		let cursor = state.cursor;
		if let Some(entry) = state.entries.get_mut(cursor) {
			*entry = address.to_string();
		}
		state.writes += 1;
	}

	fn supports_history_api(&self) -> bool {
		self.state.borrow().history_api
	}
}
