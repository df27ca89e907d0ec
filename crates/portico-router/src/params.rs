//! Route parameter values.
//!
//! Captured path segments are coerced to numbers when the whole segment reads
//! as one, so `/test/1` yields `id = 1` rather than `id = "1"`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered parameter mapping. Keys are sorted, which keeps generated query
/// strings deterministic.
pub type Params = BTreeMap<String, ParamValue>;

/// A single route or query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// Whole-number value.
	Int(i64),
	/// Finite decimal value.
	Float(f64),
	/// Anything else.
	Text(String),
}

impl ParamValue {
	/// Coerces a raw segment.
	///
	/// The whole string must parse: first as an `i64`, then as a finite `f64`.
	/// Only strings starting with a digit, `-` or `.` are considered numeric,
	/// so spellings like `inf`, `NaN` or `+1` stay text.
	pub fn coerce(raw: &str) -> Self {
		let numeric_start = raw
			.chars()
			.next()
			.is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '.');
		if numeric_start {
			if let Ok(value) = raw.parse::<i64>() {
				return Self::Int(value);
			}
			if let Ok(value) = raw.parse::<f64>()
				&& value.is_finite()
			{
				return Self::Float(value);
			}
		}
		Self::Text(raw.to_string())
	}

	/// Returns the text value, if this is text.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(value) => Some(value),
			_ => None,
		}
	}

	/// Returns the integer value, if this is an integer.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			_ => None,
		}
	}

	/// Returns a numeric view of integers and floats.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Int(value) => Some(*value as f64),
			Self::Float(value) => Some(*value),
			Self::Text(_) => None,
		}
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(value) => write!(f, "{}", value),
			Self::Float(value) => write!(f, "{}", value),
			Self::Text(value) => f.write_str(value),
		}
	}
}

impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<i64> for ParamValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for ParamValue {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u32> for ParamValue {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<f64> for ParamValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

/// Builds a [`Params`] map from `(name, value)` pairs.
///
/// ```
/// use portico_router::params::{ParamValue, params};
///
/// let p = params([("name", ParamValue::from("service")), ("page", 2.into())]);
/// assert_eq!(p["page"], ParamValue::Int(2));
/// ```
pub fn params<K, I>(pairs: I) -> Params
where
	K: Into<String>,
	I: IntoIterator<Item = (K, ParamValue)>,
{
	pairs
		.into_iter()
		.map(|(name, value)| (name.into(), value))
		.collect()
}
