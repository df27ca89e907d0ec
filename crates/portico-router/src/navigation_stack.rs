//! Navigation history with directional skip rules.
//!
//! The stack records every page the user landed on. A skip rule `B -> A`
//! says "when going back from B towards A, pass over B": a single back
//! gesture then collapses every skip-marked entry in one step.
//!
//! ```text
//! push A, push B, push C     stack: [A, B, C]   rule: B -> A
//! back (C -> B requested)    pop C, B -> A holds, pop B
//!                            stack: [A]          lands on A
//! ```

use crate::params::Params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One history entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutePage {
	/// Route name.
	pub page: String,
	/// Parameters the page was visited with.
	#[serde(default)]
	pub params: Params,
}

impl RoutePage {
	/// Creates an entry without parameters.
	pub fn new(page: impl Into<String>) -> Self {
		Self {
			page: page.into(),
			params: Params::new(),
		}
	}

	/// Sets the parameters.
	pub fn with_params(mut self, params: Params) -> Self {
		self.params = params;
		self
	}
}

/// A `{from, to}` page-name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Navigation {
	pub from: Option<String>,
	pub to: String,
}

impl Navigation {
	pub fn new(from: Option<&str>, to: impl Into<String>) -> Self {
		Self {
			from: from.map(str::to_string),
			to: to.into(),
		}
	}
}

fn skip_key(from: &str, to: &str) -> String {
	format!("{}:{}", from, to)
}

/// Ordered history of visited pages plus skip rules.
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
	stack: Vec<RoutePage>,
	skip_nav: HashMap<String, bool>,
}

impl NavigationStack {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `route` unless the top entry already is the same page.
	pub fn push(&mut self, route: RoutePage) {
		if self.top().is_some_and(|top| top.page == route.page) {
			return;
		}
		self.stack.push(route);
	}

	/// Overwrites the top entry, under the same same-page guard as `push`.
	///
	/// On an empty stack the entry is pushed.
	pub fn replace(&mut self, route: RoutePage) {
		if self.top().is_some_and(|top| top.page == route.page) {
			return;
		}
		self.stack.pop();
		self.stack.push(route);
	}

	pub fn pop(&mut self) -> Option<RoutePage> {
		self.stack.pop()
	}

	pub fn top(&self) -> Option<&RoutePage> {
		self.stack.last()
	}

	/// Entry right below the top.
	pub fn below_top(&self) -> Option<&RoutePage> {
		self.stack.len().checked_sub(2).map(|index| &self.stack[index])
	}

	pub fn len(&self) -> usize {
		self.stack.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stack.is_empty()
	}

	/// Entries from bottom to top.
	pub fn entries(&self) -> &[RoutePage] {
		&self.stack
	}

	/// Records a directional skip rule. `None` leaves any existing rule as is.
	pub fn add_skip_navigation(&mut self, from: &str, to: &str, skip_history: Option<bool>) {
		if let Some(skip) = skip_history {
			self.skip_nav.insert(skip_key(from, to), skip);
		}
	}

	/// Exact directional lookup; unknown pairs are not skipped.
	pub fn is_skip_navigation(&self, from: &str, to: &str) -> bool {
		self.skip_nav
			.get(&skip_key(from, to))
			.copied()
			.unwrap_or(false)
	}

	/// Returns `true` while the top entry is marked to be skipped towards the
	/// entry below it.
	pub(crate) fn top_is_skipped(&self) -> bool {
		match (self.top(), self.below_top()) {
			(Some(top), Some(below)) => self.is_skip_navigation(&top.page, &below.page),
			_ => false,
		}
	}

	/// Applies a navigation and returns the resolved landing entry.
	///
	/// A navigation that retraces the last transition in reverse is a back
	/// move: the top is popped, then every entry skip-marked towards the one
	/// below it. Anything else is pushed.
	pub fn update(&mut self, from: Option<&RoutePage>, to: RoutePage) -> Option<&RoutePage> {
		let going_back = match (from, self.top(), self.below_top()) {
			(Some(from), Some(top), Some(below)) => from.page == top.page && to.page == below.page,
			_ => false,
		};

		if going_back {
			self.stack.pop();
			while self.stack.len() > 1 && self.top_is_skipped() {
				self.stack.pop();
			}
		} else {
			self.push(to);
		}
		self.top()
	}

	/// Pops entries up to and including the first one for `page`.
	///
	/// Does nothing if `page` is not on the stack.
	pub fn clear_until(&mut self, page: &str) {
		if let Some(index) = self.stack.iter().rposition(|entry| entry.page == page) {
			self.stack.truncate(index);
		}
	}

	/// Drops every entry. Skip rules are kept.
	pub fn clear(&mut self) {
		self.stack.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::{ParamValue, params};
	use rstest::{fixture, rstest};

	fn pages(stack: &NavigationStack) -> Vec<&str> {
		stack.entries().iter().map(|e| e.page.as_str()).collect()
	}

	#[fixture]
	fn abc() -> NavigationStack {
		let mut stack = NavigationStack::new();
		for page in ["a", "b", "c"] {
			stack.push(RoutePage::new(page));
		}
		stack
	}

	#[rstest]
	fn test_push_same_page_is_noop() {
		let mut stack = NavigationStack::new();

		stack.push(RoutePage::new("home"));
		stack.push(RoutePage::new("home").with_params(params([("x", ParamValue::Int(1))])));

		assert_eq!(stack.len(), 1);
		assert!(stack.top().unwrap().params.is_empty());
	}

	#[rstest]
	fn test_replace(mut abc: NavigationStack) {
		abc.replace(RoutePage::new("d"));
		abc.replace(RoutePage::new("d"));

		assert_eq!(pages(&abc), vec!["a", "b", "d"]);
	}

	#[rstest]
	fn test_replace_on_empty_stack_pushes() {
		let mut stack = NavigationStack::new();

		stack.replace(RoutePage::new("home"));

		assert_eq!(pages(&stack), vec!["home"]);
	}

	#[rstest]
	fn test_pop_and_top_on_empty() {
		let mut stack = NavigationStack::new();

		assert!(stack.pop().is_none());
		assert!(stack.top().is_none());
		assert!(stack.below_top().is_none());
	}

	#[rstest]
	fn test_skip_rules_are_directional() {
		let mut stack = NavigationStack::new();

		stack.add_skip_navigation("b", "a", Some(true));

		assert!(stack.is_skip_navigation("b", "a"));
		assert!(!stack.is_skip_navigation("a", "b"));
	}

	#[rstest]
	fn test_add_skip_navigation_none_is_noop() {
		let mut stack = NavigationStack::new();
		stack.add_skip_navigation("b", "a", Some(true));

		stack.add_skip_navigation("b", "a", None);
		assert!(stack.is_skip_navigation("b", "a"));

		stack.add_skip_navigation("b", "a", Some(false));
		assert!(!stack.is_skip_navigation("b", "a"));
	}

	#[rstest]
	fn test_update_forward_pushes(mut abc: NavigationStack) {
		let from = RoutePage::new("c");

		let top = abc.update(Some(&from), RoutePage::new("d")).cloned();

		assert_eq!(top, Some(RoutePage::new("d")));
		assert_eq!(abc.len(), 4);
	}

	#[rstest]
	fn test_update_back_without_skip(mut abc: NavigationStack) {
		let from = RoutePage::new("c");

		let top = abc.update(Some(&from), RoutePage::new("b")).cloned();

		assert_eq!(top, Some(RoutePage::new("b")));
		assert_eq!(pages(&abc), vec!["a", "b"]);
	}

	#[rstest]
	fn test_update_back_collapses_skipped_entries(mut abc: NavigationStack) {
		// Arrange
		abc.add_skip_navigation("b", "a", Some(true));
		let from = RoutePage::new("c");

		// Act
		let top = abc.update(Some(&from), RoutePage::new("b")).cloned();

		// Assert
		assert_eq!(top, Some(RoutePage::new("a")));
		assert_eq!(pages(&abc), vec!["a"]);
	}

	#[rstest]
	fn test_update_back_collapses_chain() {
		// Arrange
		let mut stack = NavigationStack::new();
		for page in ["a", "b", "c", "d"] {
			stack.push(RoutePage::new(page));
		}
		stack.add_skip_navigation("c", "b", Some(true));
		stack.add_skip_navigation("b", "a", Some(true));

		// Act
		let top = stack
			.update(Some(&RoutePage::new("d")), RoutePage::new("c"))
			.cloned();

		// Assert
		assert_eq!(top, Some(RoutePage::new("a")));
	}

	#[rstest]
	fn test_update_never_empties_stack() {
		let mut stack = NavigationStack::new();
		stack.push(RoutePage::new("a"));
		stack.push(RoutePage::new("b"));
		stack.add_skip_navigation("a", "b", Some(true));

		let top = stack
			.update(Some(&RoutePage::new("b")), RoutePage::new("a"))
			.cloned();

		assert_eq!(top, Some(RoutePage::new("a")));
		assert_eq!(stack.len(), 1);
	}

	#[rstest]
	fn test_update_without_from_pushes() {
		let mut stack = NavigationStack::new();

		let top = stack.update(None, RoutePage::new("home")).cloned();

		assert_eq!(top, Some(RoutePage::new("home")));
	}

	#[rstest]
	#[case("b", vec!["a"])]
	#[case("a", vec![])]
	#[case("missing", vec!["a", "b", "c"])]
	fn test_clear_until(mut abc: NavigationStack, #[case] target: &str, #[case] expected: Vec<&str>) {
		abc.clear_until(target);

		assert_eq!(pages(&abc), expected);
	}
}
