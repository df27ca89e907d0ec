//! Internal router event bus.
//!
//! The router and the rendering collaborator share an [`EventBus`] clone and
//! exchange typed [`RouterEvent`]s over it. Listeners run synchronously, in
//! registration order, inside [`EventBus::emit`].

use crate::route::RouteSnapshot;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Events exchanged between the router and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
	/// A navigation was committed.
	RouteMatched(RouteSnapshot),
	/// The page of `route` finished rendering.
	TransitionEnd {
		/// Route name.
		route: String,
	},
	/// `back()` was called.
	BackstepRequested {
		/// Page the user leaves.
		from: String,
		/// Page the user lands on.
		to: String,
	},
}

impl RouterEvent {
	/// Short event name for logs.
	pub fn as_label(&self) -> &'static str {
		match self {
			Self::RouteMatched(_) => "route-matched",
			Self::TransitionEnd { .. } => "transition-end",
			Self::BackstepRequested { .. } => "backstep-requested",
		}
	}
}

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&RouterEvent)>;

#[derive(Default)]
struct BusState {
	next_id: u64,
	listeners: Vec<(ListenerId, Listener)>,
}

/// Synchronous, single-threaded event bus.
#[derive(Clone, Default)]
pub struct EventBus {
	state: Rc<RefCell<BusState>>,
}

impl fmt::Debug for EventBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBus")
			.field("listeners", &self.state.borrow().listeners.len())
			.finish()
	}
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a listener for every event.
	pub fn listen<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&RouterEvent) + 'static,
	{
		let mut state = self.state.borrow_mut();
		state.next_id += 1;
		let id = ListenerId(state.next_id);
		state.listeners.push((id, Rc::new(listener)));
		id
	}

	/// Removes a listener. Returns `false` if it was not registered.
	pub fn unlisten(&self, id: ListenerId) -> bool {
		let mut state = self.state.borrow_mut();
		let before = state.listeners.len();
		state.listeners.retain(|(listener, _)| *listener != id);
		before != state.listeners.len()
	}

	/// Delivers `event` to every listener.
	pub fn emit(&self, event: RouterEvent) {
		let listeners: Vec<Listener> = self
			.state
			.borrow()
			.listeners
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		tracing::debug!(event = event.as_label(), listeners = listeners.len(), "router event");
		for listener in listeners {
			listener(&event);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.state.borrow().listeners.len()
	}
}
