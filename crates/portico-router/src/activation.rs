//! Page activation seam.
//!
//! After a navigation is committed the router asks a [`PageActivator`] to
//! show the page. Rendering may finish synchronously or later; in the latter
//! case the host calls [`Router::transition_end`](crate::Router::transition_end)
//! once the page is rendered, and until then further `go` calls are dropped.

use crate::route::RouteSnapshot;

/// Outcome of activating a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
	/// The page is rendered.
	Complete,
	/// Rendering continues; the host reports completion later.
	Pending,
}

/// Renders committed routes into the main node.
pub trait PageActivator {
	fn activate(&mut self, route: &RouteSnapshot, main_node: &str) -> Activation;
}

impl<F> PageActivator for F
where
	F: FnMut(&RouteSnapshot, &str) -> Activation,
{
	fn activate(&mut self, route: &RouteSnapshot, main_node: &str) -> Activation {
		self(route, main_node)
	}
}

/// Activator for hosts that render synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateActivator;

impl PageActivator for ImmediateActivator {
	fn activate(&mut self, route: &RouteSnapshot, main_node: &str) -> Activation {
		tracing::debug!(route = %route.name, main_node, "page activated");
		Activation::Complete
	}
}
