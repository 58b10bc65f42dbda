use std::collections::BTreeMap;

use qdrant_client::qdrant::{Condition, Filter, Range};
use serde_json::{Map, Value};

use crate::{Error, Result};
use quarry_domain::metadata_path;

/// Payload key under which document metadata lives in Qdrant.
pub const METADATA_PAYLOAD_KEY: &str = "metadata";

/// Exact-match metadata predicate. Keys are dotted paths, values are scalars and every entry must
/// match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataFilter {
	entries: BTreeMap<String, Value>,
}
impl MetadataFilter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
		let mut filter = Self::new();

		for (key, value) in map {
			filter.insert(key.clone(), value.clone())?;
		}

		Ok(filter)
	}

	/// Parses a `key=value` pair. Values read as booleans or numbers when they parse as one, and
	/// as strings otherwise.
	pub fn parse_pair(raw: &str) -> Result<(String, Value)> {
		let Some((key, value)) = raw.split_once('=') else {
			return Err(Error::InvalidArgument(format!("Filter {raw:?} must be key=value.")));
		};
		let key = key.trim();

		if key.is_empty() {
			return Err(Error::InvalidArgument(format!("Filter {raw:?} has an empty key.")));
		}

		let value = value.trim();
		let parsed = match value {
			"true" => Value::Bool(true),
			"false" => Value::Bool(false),
			_ =>
				if let Ok(int) = value.parse::<i64>() {
					Value::from(int)
				} else if let Some(number) =
					value.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
				{
					Value::Number(number)
				} else {
					Value::String(value.to_string())
				},
		};

		Ok((key.to_string(), parsed))
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
		self.insert(key.into(), value.into())?;

		Ok(self)
	}

	pub fn insert(&mut self, key: String, value: Value) -> Result<()> {
		if key.trim().is_empty() {
			return Err(Error::InvalidArgument("Filter keys must be non-empty.".to_string()));
		}
		if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
			return Err(Error::InvalidArgument(format!(
				"Filter value for {key:?} must be a string, number or boolean."
			)));
		}

		self.entries.insert(key, value);

		Ok(())
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
		self.entries.iter().all(|(key, expected)| {
			metadata_path(metadata, key).map(|actual| scalar_eq(actual, expected)).unwrap_or(false)
		})
	}

	/// Equivalent Qdrant filter over the `metadata` payload. Numbers compare by value through a
	/// closed range, so an integer filter also matches a stored float. A dotted key matches either
	/// the nested path or a literal key of that name; unlike [`Self::matches`], a literal key does
	/// not shadow the nested path when a payload carries both.
	pub fn to_qdrant(&self) -> Filter {
		let conditions: Vec<Condition> = self
			.entries
			.iter()
			.map(|(key, value)| {
				let nested = field_condition(format!("{METADATA_PAYLOAD_KEY}.{key}"), value);

				if key.contains('.') {
					let literal =
						field_condition(format!("{METADATA_PAYLOAD_KEY}.\"{key}\""), value);

					Condition::from(Filter::should([nested, literal]))
				} else {
					nested
				}
			})
			.collect();

		Filter::must(conditions)
	}
}

fn field_condition(field: String, value: &Value) -> Condition {
	match value {
		Value::Bool(flag) => Condition::matches(field, *flag),
		Value::Number(number) => {
			let number = number.as_f64().unwrap_or_default();

			Condition::range(
				field,
				Range { gte: Some(number), lte: Some(number), ..Default::default() },
			)
		},
		other => Condition::matches(field, scalar_text(other)),
	}
}

fn scalar_eq(actual: &Value, expected: &Value) -> bool {
	match (actual, expected) {
		(Value::Number(left), Value::Number(right)) => match (left.as_i64(), right.as_i64()) {
			(Some(left), Some(right)) => left == right,
			_ => left.as_f64() == right.as_f64(),
		},
		_ => actual == expected,
	}
}

fn scalar_text(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
