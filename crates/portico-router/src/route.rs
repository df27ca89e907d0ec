//! Route patterns, matching and path generation.
//!
//! A [`Route`] owns one or more path templates. Templates use `:name` for a
//! single path segment and an optional trailing `*` for prefix routes:
//!
//! | Template            | Matches                         | Does not match  |
//! |---------------------|---------------------------------|-----------------|
//! | `/`                 | `/`, empty path                 | `/a`            |
//! | `/categories/:name` | `/categories/tv`, `/categories/tv/` | `/categories` |
//! | `/test/*`           | `/test/`, `/test/a/b`           | `/test`, `/testing` |
//!
//! Templates of a route are tried in declaration order and the first match
//! wins, so several templates act as aliases of the same route.

use crate::error::{RouterError, RouterResult};
use crate::params::{ParamValue, Params};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

/// `:name` token inside a template.
static PARAM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("PARAM_TOKEN: invalid regex pattern")
});

/// Callback run when a route is committed.
pub type RouteAction = Rc<dyn Fn(&RouteSnapshot)>;

/// Immutable view of a route after a match, handed to collaborators.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteSnapshot {
	/// Route name.
	pub name: String,
	/// Matched path parameters.
	pub params: Params,
	/// Parsed query string.
	pub query: Params,
	/// Remainder after a wildcard match, with its leading slash.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub subroute: Option<String>,
	/// Associated UI element.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub component: Option<String>,
}

/// Result of matching an address against a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
	/// Index of the template that matched.
	pub index: usize,
	/// The template that matched.
	pub pattern: String,
	/// The compiled expression of that template.
	pub regex: String,
	/// Raw captures, in template order.
	pub captures: Vec<String>,
	/// Unmatched tail of the path (wildcard routes only).
	pub rest: String,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
	regex: Regex,
	param_names: Vec<String>,
}

/// A named route.
pub struct Route {
	name: String,
	patterns: Vec<String>,
	compiled: Vec<CompiledPattern>,
	wildcard: bool,
	params: Params,
	query: Params,
	subroute: Option<String>,
	is_accessible: bool,
	redirect_page: Option<String>,
	not_found: bool,
	component: Option<String>,
	action: Option<RouteAction>,
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("patterns", &self.patterns)
			.field("params", &self.params)
			.field("query", &self.query)
			.field("subroute", &self.subroute)
			.field("is_accessible", &self.is_accessible)
			.field("not_found", &self.not_found)
			.field("component", &self.component)
			.field("has_action", &self.action.is_some())
			.finish()
	}
}

impl Route {
	/// Creates a route and compiles its templates.
	///
	/// # Errors
	///
	/// See [`compile`](Self::compile).
	pub fn new<I, S>(name: impl Into<String>, patterns: I) -> RouterResult<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut route = Self {
			name: name.into(),
			patterns: Vec::new(),
			compiled: Vec::new(),
			wildcard: false,
			params: Params::new(),
			query: Params::new(),
			subroute: None,
			is_accessible: true,
			redirect_page: None,
			not_found: false,
			component: None,
			action: None,
		};
		route.compile(patterns.into_iter().map(Into::into).collect())?;
		Ok(route)
	}

	/// Marks this route as the not-found route.
	///
	/// The not-found route is skipped by ordinary matching until the router
	/// redirects to it.
	pub fn not_found(mut self) -> Self {
		self.not_found = true;
		self.is_accessible = false;
		self.redirect_page = Some(self.name.clone());
		self
	}

	/// Sets the associated UI element name.
	pub fn with_component(mut self, component: impl Into<String>) -> Self {
		self.component = Some(component.into());
		self
	}

	/// Sets the callback run when this route is committed.
	pub fn with_action<F>(mut self, action: F) -> Self
	where
		F: Fn(&RouteSnapshot) + 'static,
	{
		self.action = Some(Rc::new(action));
		self
	}

	pub(crate) fn set_action(&mut self, action: Option<RouteAction>) {
		self.action = action;
	}

	/// Replaces the templates.
	///
	/// # Errors
	///
	/// - [`RouterError::EmptyPatterns`] for an empty list
	/// - [`RouterError::MultipleWildcards`] if more than one template contains `*`
	/// - [`RouterError::InvalidPattern`] if a template does not compile
	pub fn compile(&mut self, patterns: Vec<String>) -> RouterResult<()> {
		if patterns.is_empty() {
			return Err(RouterError::EmptyPatterns {
				route: self.name.clone(),
			});
		}
		let wildcards = patterns.iter().filter(|p| p.contains('*')).count();
		if wildcards > 1 {
			return Err(RouterError::MultipleWildcards {
				route: self.name.clone(),
			});
		}

		let compiled = patterns
			.iter()
			.map(|pattern| compile_pattern(pattern))
			.collect::<RouterResult<Vec<_>>>()?;

		self.patterns = patterns;
		self.compiled = compiled;
		self.wildcard = wildcards == 1;
		Ok(())
	}

	/// Tries each template in order and returns the first match.
	pub fn match_path(&self, path: &str) -> Option<PathMatch> {
		self.compiled
			.iter()
			.enumerate()
			.find_map(|(index, compiled)| {
				let caps = compiled.regex.captures(path)?;
				let whole = caps.get(0)?;
				let captures = (1..caps.len())
					.map(|group| {
						caps.get(group)
							.map(|m| m.as_str().to_string())
							.unwrap_or_default()
					})
					.collect();
				Some(PathMatch {
					index,
					pattern: self.patterns[index].clone(),
					regex: compiled.regex.as_str().to_string(),
					captures,
					rest: path[whole.end()..].to_string(),
				})
			})
	}

	/// Matches `path` (optionally followed by `?query`) and updates `params`,
	/// `query` and `subroute`.
	///
	/// Returns `false` and resets all three if nothing matched.
	pub fn parse_path(&mut self, path: &str) -> bool {
		let (path, query) = split_query(path);
		let Some(found) = self.match_path(path) else {
			self.params.clear();
			self.query.clear();
			self.subroute = None;
			return false;
		};

		let names = &self.compiled[found.index].param_names;
		self.params = names
			.iter()
			.zip(&found.captures)
			.map(|(name, raw)| (name.clone(), ParamValue::coerce(&decode(raw))))
			.collect();
		self.query = query.map(parse_query).unwrap_or_default();
		self.subroute = (!found.rest.is_empty()).then(|| format!("/{}", found.rest));
		true
	}

	/// Generates the canonical path from the first template.
	///
	/// Parameters not consumed by a `:name` token are appended as a query
	/// string, sorted by key.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MissingParameter`] when a token has no value.
	pub fn path(&self, params: &Params) -> RouterResult<String> {
		let template = self.patterns[0].replace('*', "");
		let mut consumed = HashSet::new();
		let mut path = String::with_capacity(template.len());
		let mut last = 0;

		for caps in PARAM_TOKEN.captures_iter(&template) {
			let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
				continue;
			};
			let value = params
				.get(name.as_str())
				.ok_or_else(|| RouterError::MissingParameter {
					route: self.name.clone(),
					param: name.as_str().to_string(),
				})?;
			path.push_str(&template[last..token.start()]);
			path.push_str(&urlencoding::encode(&value.to_string()));
			consumed.insert(name.as_str());
			last = token.end();
		}
		path.push_str(&template[last..]);

		let query: Vec<String> = params
			.iter()
			.filter(|(name, _)| !consumed.contains(name.as_str()))
			.map(|(name, value)| {
				format!(
					"{}={}",
					urlencoding::encode(name),
					urlencoding::encode(&value.to_string())
				)
			})
			.collect();
		if !query.is_empty() {
			path.push('?');
			path.push_str(&query.join("&"));
		}
		Ok(path)
	}

	/// Returns `true` only for the route flagged as not-found.
	pub fn is_404(&self) -> bool {
		self.not_found
	}

	/// Returns the route name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the templates, in declaration order.
	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	/// Returns `true` if one template ends with `*`.
	pub fn is_wildcard(&self) -> bool {
		self.wildcard
	}

	/// Parameters of the last successful match.
	pub fn params(&self) -> &Params {
		&self.params
	}

	/// Overrides the parameters, e.g. for a programmatic navigation.
	pub fn set_params(&mut self, params: Params) {
		self.params = params;
	}

	/// Query of the last successful match.
	pub fn query(&self) -> &Params {
		&self.query
	}

	/// Wildcard remainder of the last successful match.
	pub fn subroute(&self) -> Option<&str> {
		self.subroute.as_deref()
	}

	pub fn is_accessible(&self) -> bool {
		self.is_accessible
	}

	pub fn set_accessible(&mut self, accessible: bool) {
		self.is_accessible = accessible;
	}

	/// Page the router redirects to when nothing matches.
	pub fn redirect_page(&self) -> Option<&str> {
		self.redirect_page.as_deref()
	}

	pub fn component(&self) -> Option<&str> {
		self.component.as_deref()
	}

	pub(crate) fn action(&self) -> Option<&RouteAction> {
		self.action.as_ref()
	}

	/// Captures the current match state.
	pub fn snapshot(&self) -> RouteSnapshot {
		RouteSnapshot {
			name: self.name.clone(),
			params: self.params.clone(),
			query: self.query.clone(),
			subroute: self.subroute.clone(),
			component: self.component.clone(),
		}
	}
}

fn compile_pattern(pattern: &str) -> RouterResult<CompiledPattern> {
	let wildcard = pattern.contains('*');
	let stripped = pattern.replace('*', "");
	let body = stripped.trim_end_matches('/');

	let mut regex = String::from("^");
	let mut param_names = Vec::new();
	let mut last = 0;
	for caps in PARAM_TOKEN.captures_iter(body) {
		let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
			continue;
		};
		regex.push_str(&regex::escape(&body[last..token.start()]));
		regex.push_str("([^/]+)");
		param_names.push(name.as_str().to_string());
		last = token.end();
	}
	regex.push_str(&regex::escape(&body[last..]));
	regex.push_str(if wildcard { "/+" } else { "/*$" });

	let regex = Regex::new(&regex).map_err(|e| RouterError::InvalidPattern {
		pattern: pattern.to_string(),
		reason: e.to_string(),
	})?;
	Ok(CompiledPattern { regex, param_names })
}

/// Splits `path?query` into its parts.
pub(crate) fn split_query(address: &str) -> (&str, Option<&str>) {
	match address.split_once('?') {
		Some((path, query)) => (path, Some(query)),
		None => (address, None),
	}
}

fn decode(raw: &str) -> String {
	urlencoding::decode(raw)
		.map(|decoded| decoded.into_owned())
		.unwrap_or_else(|_| raw.to_string())
}

fn parse_query(query: &str) -> Params {
	let mut parsed = BTreeMap::new();
	for pair in query.split('&').filter(|pair| !pair.is_empty()) {
		let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
		parsed.insert(
			decode(&name.replace('+', " ")),
			ParamValue::Text(decode(&value.replace('+', " "))),
		);
	}
	parsed
}
