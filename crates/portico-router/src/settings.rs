//! Router settings and route-table input.
//!
//! Settings can be built in code, parsed from JSON, or overlaid from
//! environment variables:
//!
//! | Variable              | Field         |
//! |-----------------------|---------------|
//! | `PORTICO_USE_HISTORY` | `use_history` |
//! | `PORTICO_HASH_PREFIX` | `hash_prefix` |
//! | `PORTICO_MAIN_NODE`   | `main_node`   |

use crate::address::DEFAULT_HASH_PREFIX;
use crate::error::{RouterError, RouterResult};
use crate::route::{Route, RouteAction, RouteSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// One or several path templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutePaths {
	One(String),
	Many(Vec<String>),
}

impl RoutePaths {
	pub fn into_vec(self) -> Vec<String> {
		match self {
			Self::One(path) => vec![path],
			Self::Many(paths) => paths,
		}
	}
}

impl From<&str> for RoutePaths {
	fn from(path: &str) -> Self {
		Self::One(path.to_string())
	}
}

impl From<Vec<&str>> for RoutePaths {
	fn from(paths: Vec<&str>) -> Self {
		Self::Many(paths.into_iter().map(str::to_string).collect())
	}
}

/// Route registration entry: `{name, path, action, notFound, component}`.
///
/// `action` cannot come from configuration; attach it with
/// [`with_action`](Self::with_action).
#[derive(Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
	pub name: String,
	pub path: RoutePaths,
	#[serde(default, alias = "notFound")]
	pub not_found: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub component: Option<String>,
	#[serde(skip)]
	pub action: Option<RouteAction>,
}

impl fmt::Debug for RouteDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteDefinition")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("not_found", &self.not_found)
			.field("component", &self.component)
			.field("has_action", &self.action.is_some())
			.finish()
	}
}

impl RouteDefinition {
	pub fn new(name: impl Into<String>, path: impl Into<RoutePaths>) -> Self {
		Self {
			name: name.into(),
			path: path.into(),
			not_found: false,
			component: None,
			action: None,
		}
	}

	/// Flags the definition as the not-found route.
	pub fn not_found(mut self) -> Self {
		self.not_found = true;
		self
	}

	pub fn with_component(mut self, component: impl Into<String>) -> Self {
		self.component = Some(component.into());
		self
	}

	pub fn with_action<F>(mut self, action: F) -> Self
	where
		F: Fn(&RouteSnapshot) + 'static,
	{
		self.action = Some(Rc::new(action));
		self
	}

	/// Compiles the definition.
	///
	/// # Errors
	///
	/// Propagates pattern errors from [`Route::new`].
	pub fn into_route(self) -> RouterResult<Route> {
		let mut route = Route::new(self.name, self.path.into_vec())?;
		if self.not_found {
			route = route.not_found();
		}
		if let Some(component) = self.component {
			route = route.with_component(component);
		}
		route.set_action(self.action);
		Ok(route)
	}
}

/// Router configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
	/// Use History-API routing instead of hash routing.
	#[serde(default)]
	pub use_history: bool,

	/// Prefix for hash routing.
	#[serde(default = "default_hash_prefix")]
	pub hash_prefix: String,

	/// Element pages are rendered into.
	#[serde(default)]
	pub main_node: Option<String>,

	/// Route table.
	#[serde(default)]
	pub routes: Option<Vec<RouteDefinition>>,
}

fn default_hash_prefix() -> String {
	DEFAULT_HASH_PREFIX.to_string()
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			use_history: false,
			hash_prefix: default_hash_prefix(),
			main_node: None,
			routes: None,
		}
	}
}

impl RouterSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_main_node(mut self, main_node: impl Into<String>) -> Self {
		self.main_node = Some(main_node.into());
		self
	}

	pub fn with_routes(mut self, routes: Vec<RouteDefinition>) -> Self {
		self.routes = Some(routes);
		self
	}

	pub fn with_history(mut self, use_history: bool) -> Self {
		self.use_history = use_history;
		self
	}

	/// Parses settings from JSON.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Settings`] on malformed input.
	pub fn from_json(json: &str) -> RouterResult<Self> {
		serde_json::from_str(json)
			.map_err(|e| RouterError::Settings(format!("JSON parse error: {}", e)))
	}

	/// Defaults overlaid with `PORTICO_*` environment variables.
	pub fn from_env() -> RouterResult<Self> {
		let mut settings = Self::default();
		settings.apply_env();
		settings.validate()?;
		Ok(settings)
	}

	/// Overlays `PORTICO_*` environment variables onto these settings.
	pub fn apply_env(&mut self) {
		if let Ok(use_history) = std::env::var("PORTICO_USE_HISTORY") {
			self.use_history = use_history.to_lowercase() == "true" || use_history == "1";
		}
		if let Ok(prefix) = std::env::var("PORTICO_HASH_PREFIX") {
			self.hash_prefix = prefix;
		}
		if let Ok(main_node) = std::env::var("PORTICO_MAIN_NODE") {
			self.main_node = Some(main_node);
		}
	}

	/// Checks internal consistency.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Settings`] if hash routing is selected with an
	/// empty or non-`#` prefix.
	pub fn validate(&self) -> RouterResult<()> {
		if !self.use_history && !self.hash_prefix.starts_with('#') {
			return Err(RouterError::Settings(format!(
				"hash prefix must start with '#', got '{}'",
				self.hash_prefix
			)));
		}
		Ok(())
	}
}
