//! Channels the router publishes to.
//!
//! All of them are private: components may subscribe, only the router writes.

use crate::interceptor::InterceptorContext;
use crate::navigation_stack::Navigation;
use crate::route::RouteSnapshot;
use portico_channels::PRIVATE_CHANNEL_PREFIX;
use serde::{Deserialize, Serialize};

/// Carries an [`AppContext`] on every committed navigation.
pub const APP_CONTEXT_CHANNEL: &str = "__bridge_app";

/// Carries an [`InterceptedNavigation`] after a veto.
pub const INTERCEPTED_NAVIGATION_CHANNEL: &str = "__bridge_intercepted_navigation";

/// Carries an [`InterceptedNavigation`] after a vetoed `back()`.
pub const CANCELLED_BACK_NAVIGATION_CHANNEL: &str = "__bridge_cancelled_back_navigation";

/// Name of the per-page activity channel (`bool` payload).
pub fn page_channel(page: &str) -> String {
	format!("{}page_{}", PRIVATE_CHANNEL_PREFIX, page)
}

/// The `{from, to}` pair of a vetoed navigation.
pub type InterceptedNavigation = Navigation;

/// Application state published after each committed navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppContext {
	pub current_page: String,
	pub from_page: Option<String>,
	pub interceptor_context: InterceptorContext,
	pub current_route: RouteSnapshot,
}
