use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scorer::Scored;

/// One ranked hit. Values are never mutated after retrieval; re-scoring produces new values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
	pub id: String,
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	pub score: f32,
}
impl ScoredResult {
	pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
		Self { id: id.into(), content: content.into(), metadata: Map::new(), score }
	}

	pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
		self.metadata = metadata;

		self
	}

	pub fn with_score(&self, score: f32) -> Self {
		Self { score, ..self.clone() }
	}

	pub fn metadata_value(&self, path: &str) -> Option<&Value> {
		metadata_path(&self.metadata, path)
	}
}
impl Scored for ScoredResult {
	fn score(&self) -> f32 {
		self.score
	}
}

/// Resolves a dot-separated path against nested metadata objects. A literal key containing dots
/// takes precedence over descending into nested objects.
pub fn metadata_path<'a>(metadata: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
	if let Some(value) = metadata.get(path) {
		return Some(value);
	}

	let (head, rest) = path.split_once('.')?;

	match metadata.get(head)? {
		Value::Object(inner) => metadata_path(inner, rest),
		_ => None,
	}
}
