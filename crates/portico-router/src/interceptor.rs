//! Navigation interception.
//!
//! The host application may install an interceptor that sees every pending
//! navigation together with a free-form context map, and either lets it
//! through, vetoes it, or vetoes it and redirects elsewhere.

use crate::navigation_stack::{Navigation, RoutePage};
use std::rc::Rc;

/// Free-form data handed to the interceptor (e.g. the logged-in user).
pub type InterceptorContext = serde_json::Map<String, serde_json::Value>;

/// Host-supplied navigation guard.
///
/// Interceptors must not panic: a panic propagates to the caller of the
/// triggering navigation and leaves the router in the in-progress state.
pub type Interceptor = Rc<dyn Fn(&Navigation, &InterceptorContext) -> Interception>;

/// Interceptor decision.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interception {
	/// Veto the navigation.
	pub intercept: bool,
	/// Where to go instead. Only read when `intercept` is `true`.
	pub redirect: Option<RoutePage>,
}

impl Interception {
	/// Lets the navigation through.
	pub fn allow() -> Self {
		Self::default()
	}

	/// Vetoes the navigation and keeps the current page.
	pub fn veto() -> Self {
		Self {
			intercept: true,
			redirect: None,
		}
	}

	/// Vetoes the navigation and goes to `page` instead.
	pub fn redirect(page: RoutePage) -> Self {
		Self {
			intercept: true,
			redirect: Some(page),
		}
	}
}

/// Merges `update` into `context`, key by key.
pub(crate) fn merge_context(context: &mut InterceptorContext, update: InterceptorContext) {
	for (key, value) in update {
		context.insert(key, value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_constructors() {
		assert!(!Interception::allow().intercept);
		assert!(Interception::veto().redirect.is_none());
		assert_eq!(
			Interception::redirect(RoutePage::new("login")).redirect,
			Some(RoutePage::new("login"))
		);
	}

	#[rstest]
	fn test_merge_context_overwrites_per_key() {
		let mut context = InterceptorContext::new();
		context.insert("user".to_string(), json!("anna"));
		context.insert("role".to_string(), json!("guest"));
		let mut update = InterceptorContext::new();
		update.insert("role".to_string(), json!("admin"));

		merge_context(&mut context, update);

		assert_eq!(context.get("user"), Some(&json!("anna")));
		assert_eq!(context.get("role"), Some(&json!("admin")));
	}
}
