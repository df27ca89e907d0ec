//! Error types for routing.

use thiserror::Error;

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors raised by route registration, path generation and navigation.
///
/// Unmatched addresses are not errors: they are logged and dropped unless a
/// not-found route is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RouterError {
	/// `add_routes` was called without a route table.
	#[error("routes are not defined")]
	RoutesNotDefined,

	/// A page was dispatched before the main node was configured.
	#[error("main node is not configured")]
	MainNodeMissing,

	/// `back()` had nothing left to land on.
	#[error("no page to go back to")]
	NoBackTarget,

	/// A route was registered without any path template.
	#[error("route '{route}' has no path patterns")]
	EmptyPatterns {
		/// Route name.
		route: String,
	},

	/// More than one template of a route contains a wildcard.
	#[error("route '{route}' declares more than one wildcard pattern")]
	MultipleWildcards {
		/// Route name.
		route: String,
	},

	/// A template did not compile to a valid matcher.
	#[error("invalid pattern '{pattern}': {reason}")]
	InvalidPattern {
		/// The offending template.
		pattern: String,
		/// Compiler message.
		reason: String,
	},

	/// No route is registered under this name.
	#[error("unknown route: {0}")]
	UnknownRoute(String),

	/// A `:name` token had no value when generating a path.
	#[error("missing parameter '{param}' for route '{route}'")]
	MissingParameter {
		/// Route name.
		route: String,
		/// Parameter name.
		param: String,
	},

	/// Router settings could not be loaded or are inconsistent.
	#[error("invalid router settings: {0}")]
	Settings(String),
}

impl RouterError {
	/// Returns a short stable label for logs.
	pub fn as_label(&self) -> &'static str {
		match self {
			Self::RoutesNotDefined => "routes_not_defined",
			Self::MainNodeMissing => "main_node_missing",
			Self::NoBackTarget => "no_back_target",
			Self::EmptyPatterns { .. } => "empty_patterns",
			Self::MultipleWildcards { .. } => "multiple_wildcards",
			Self::InvalidPattern { .. } => "invalid_pattern",
			Self::UnknownRoute(_) => "unknown_route",
			Self::MissingParameter { .. } => "missing_parameter",
			Self::Settings(_) => "settings",
		}
	}

	/// Returns `true` for configuration errors that are fatal at startup.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			Self::RoutesNotDefined
				| Self::MainNodeMissing
				| Self::EmptyPatterns { .. }
				| Self::MultipleWildcards { .. }
				| Self::InvalidPattern { .. }
				| Self::Settings(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_router_error_display() {
		assert_eq!(
			RouterError::UnknownRoute("admin".to_string()).to_string(),
			"unknown route: admin"
		);
		assert_eq!(
			RouterError::MissingParameter {
				route: "category".to_string(),
				param: "name".to_string(),
			}
			.to_string(),
			"missing parameter 'name' for route 'category'"
		);
	}

	#[rstest]
	#[case(RouterError::RoutesNotDefined, true)]
	#[case(RouterError::MainNodeMissing, true)]
	#[case(RouterError::NoBackTarget, false)]
	#[case(RouterError::UnknownRoute("x".to_string()), false)]
	fn test_is_configuration(#[case] err: RouterError, #[case] expected: bool) {
		assert_eq!(err.is_configuration(), expected);
	}

	#[rstest]
	fn test_labels_are_distinct() {
		assert_ne!(
			RouterError::NoBackTarget.as_label(),
			RouterError::MainNodeMissing.as_label()
		);
	}
}
