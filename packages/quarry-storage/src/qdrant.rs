pub const DENSE_VECTOR_NAME: &str = "dense";
pub const DOC_ID_PAYLOAD_KEY: &str = "doc_id";
pub const CONTENT_PAYLOAD_KEY: &str = "content";

use std::{
	collections::HashMap,
	sync::atomic::{AtomicBool, Ordering},
};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, DeletePointsBuilder, Filter, PointId, PointStruct, Query,
		QueryPointsBuilder, ScrollPointsBuilder, UpsertPointsBuilder, Value, Vector,
		point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{
	BoxFuture, Document, Error, Hit, ListQuery, MetadataFilter, Result, SimilarityQuery,
	VectorStore, filter::METADATA_PAYLOAD_KEY,
};

/// Qdrant-backed store. Each document is one point whose id is derived from the document id and
/// whose payload carries `doc_id`, `content` and `metadata`.
pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	ready: AtomicBool,
}
impl QdrantStore {
	/// Builds the client and probes the collection. An unreachable server or a missing collection
	/// leaves the store uninitialized rather than failing, so callers can report it as unavailable.
	pub async fn connect(cfg: &quarry_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;
		let store = Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			ready: AtomicBool::new(false),
		};

		store.refresh().await;

		Ok(store)
	}

	/// Re-checks that the collection exists and updates readiness.
	pub async fn refresh(&self) -> bool {
		let ready = match self.client.collection_exists(self.collection.clone()).await {
			Ok(true) => true,
			Ok(false) => {
				tracing::warn!(collection = %self.collection, "Qdrant collection does not exist.");

				false
			},
			Err(err) => {
				tracing::warn!(
					collection = %self.collection,
					error = %err,
					"Qdrant collection probe failed."
				);

				false
			},
		};

		self.ready.store(ready, Ordering::Release);

		ready
	}

	fn ensure_ready(&self) -> Result<()> {
		if self.is_initialized() {
			Ok(())
		} else {
			Err(Error::Unavailable(format!("Qdrant collection {:?} is not ready.", self.collection)))
		}
	}

	async fn search(&self, vector: &[f32], query: &SimilarityQuery) -> Result<Vec<Hit>> {
		self.ensure_ready()?;

		if query.k == 0 {
			return Err(Error::InvalidArgument("k must be greater than zero.".to_string()));
		}

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(query.k as u64);

		if let Some(filter) = query.filter.as_ref().filter(|filter| !filter.is_empty()) {
			search = search.filter(filter.to_qdrant());
		}

		let response = self.client.query(search).await?;
		let hits: Vec<Hit> = response
			.result
			.into_iter()
			.map(|point| Hit {
				document: document_from_payload(point.id.as_ref(), point.payload),
				score: point.score,
			})
			.collect();

		tracing::debug!(
			collection = %self.collection,
			k = query.k,
			hits = hits.len(),
			"Qdrant search completed."
		);

		Ok(hits)
	}

	async fn count(&self, filter: Option<&MetadataFilter>) -> Result<u64> {
		self.ensure_ready()?;

		let mut count = CountPointsBuilder::new(self.collection.clone()).exact(true);

		if let Some(filter) = filter.filter(|filter| !filter.is_empty()) {
			count = count.filter(filter.to_qdrant());
		}

		let response = self.client.count(count).await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}

	async fn list(&self, query: &ListQuery) -> Result<Vec<Document>> {
		self.ensure_ready()?;

		if query.limit == 0 {
			return Ok(Vec::new());
		}

		let window = u32::try_from(query.offset.saturating_add(query.limit)).unwrap_or(u32::MAX);
		let mut scroll =
			ScrollPointsBuilder::new(self.collection.clone()).limit(window).with_payload(true);

		if let Some(filter) = query.filter.as_ref().filter(|filter| !filter.is_empty()) {
			scroll = scroll.filter(filter.to_qdrant());
		}

		let response = self.client.scroll(scroll).await?;

		Ok(response
			.result
			.into_iter()
			.skip(query.offset)
			.take(query.limit)
			.map(|point| document_from_payload(point.id.as_ref(), point.payload))
			.collect())
	}

	async fn upsert(&self, document: Document, vector: Vec<f32>) -> Result<()> {
		self.ensure_ready()?;

		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector for {:?} has {} dimensions, expected {}.",
				document.id,
				vector.len(),
				self.vector_dim
			)));
		}

		let point_id = point_id_for(&document.id);
		let mut payload_map = HashMap::new();

		payload_map.insert(DOC_ID_PAYLOAD_KEY.to_string(), Value::from(document.id.clone()));
		payload_map.insert(CONTENT_PAYLOAD_KEY.to_string(), Value::from(document.content));
		payload_map.insert(
			METADATA_PAYLOAD_KEY.to_string(),
			Value::from(JsonValue::Object(document.metadata)),
		);

		let payload = Payload::from(payload_map);
		let mut vector_map = HashMap::new();

		vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector));

		let point = PointStruct::new(point_id.to_string(), vector_map, payload);
		let upsert = UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true);

		self.client.upsert_points(upsert).await?;

		tracing::debug!(collection = %self.collection, doc_id = %document.id, "Stored document.");

		Ok(())
	}

	async fn delete(&self, id: &str) -> Result<bool> {
		self.ensure_ready()?;

		let filter = Filter::must([Condition::matches(DOC_ID_PAYLOAD_KEY, id.to_string())]);
		let count =
			CountPointsBuilder::new(self.collection.clone()).filter(filter.clone()).exact(true);
		let existing =
			self.client.count(count).await?.result.map(|result| result.count).unwrap_or(0);

		if existing == 0 {
			return Ok(false);
		}

		let delete = DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

		self.client.delete_points(delete).await?;

		Ok(true)
	}
}
impl VectorStore for QdrantStore {
	fn is_initialized(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	fn search_similar<'a>(
		&'a self,
		vector: &'a [f32],
		query: &'a SimilarityQuery,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(self.search(vector, query))
	}

	fn count_documents<'a>(
		&'a self,
		filter: Option<&'a MetadataFilter>,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(self.count(filter))
	}

	fn list_documents<'a>(&'a self, query: &'a ListQuery) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(self.list(query))
	}

	fn store_document<'a>(
		&'a self,
		document: Document,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert(document, vector))
	}

	fn remove_document<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.delete(id))
	}
}

/// Stable point id for a document id.
pub fn point_id_for(doc_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes())
}

fn document_from_payload(point_id: Option<&PointId>, payload: HashMap<String, Value>) -> Document {
	let mut payload = payload;
	let id = payload
		.remove(DOC_ID_PAYLOAD_KEY)
		.and_then(|value| match value.kind {
			Some(Kind::StringValue(text)) => Some(text),
			_ => None,
		})
		.or_else(|| point_id.and_then(point_id_text))
		.unwrap_or_default();
	let content = match payload.remove(CONTENT_PAYLOAD_KEY).and_then(|value| value.kind) {
		Some(Kind::StringValue(text)) => text,
		_ => String::new(),
	};
	let metadata = match payload.remove(METADATA_PAYLOAD_KEY).map(to_json) {
		Some(JsonValue::Object(map)) => map,
		_ => Map::new(),
	};

	Document { id, content, metadata }
}

fn point_id_text(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(num)) => Some(num.to_string()),
		None => None,
	}
}

fn to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(flag),
		Some(Kind::IntegerValue(int)) => JsonValue::from(int),
		Some(Kind::DoubleValue(float)) =>
			serde_json::Number::from_f64(float).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(text)) => JsonValue::String(text),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.into_iter().map(|(key, value)| (key, to_json(value))).collect(),
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn point_ids_are_stable_per_document() {
		assert_eq!(point_id_for("doc-1"), point_id_for("doc-1"));
		assert_ne!(point_id_for("doc-1"), point_id_for("doc-2"));
	}

	#[test]
	fn decodes_payload_into_document() {
		let mut payload = HashMap::new();

		payload.insert(DOC_ID_PAYLOAD_KEY.to_string(), Value::from("guide".to_string()));
		payload.insert(CONTENT_PAYLOAD_KEY.to_string(), Value::from("Setup guide".to_string()));
		payload.insert(
			METADATA_PAYLOAD_KEY.to_string(),
			Value::from(serde_json::json!({ "lang": "en", "draft": false, "tags": ["a"] })),
		);

		let document = document_from_payload(None, payload);

		assert_eq!(document.id, "guide");
		assert_eq!(document.content, "Setup guide");
		assert_eq!(
			JsonValue::Object(document.metadata),
			serde_json::json!({ "lang": "en", "draft": false, "tags": ["a"] })
		);
	}

	#[test]
	fn falls_back_to_point_id_without_doc_id() {
		let point_id = PointId::from(point_id_for("x").to_string());
		let document = document_from_payload(Some(&point_id), HashMap::new());

		assert_eq!(document.id, point_id_for("x").to_string());
		assert!(document.content.is_empty());
		assert!(document.metadata.is_empty());
	}
}
