mod collection;
mod embedder;
mod error;

pub use collection::{TestCollection, env_qdrant_url};
pub use embedder::{FailingEmbedder, HashEmbedder};
pub use error::{Error, Result};

use serde_json::Value;

use quarry_config::Config;
use quarry_providers::Embedder;
use quarry_storage::{Document, MemoryStore, VectorStore};

/// A fixture document: id, content and a JSON object of metadata.
pub type SeedDocument<'a> = (&'a str, &'a str, Value);

/// Valid configuration for the in-memory adapter with the given vector dimension.
pub fn config(dimensions: u32) -> Result<Config> {
	config_with(dimensions, "")
}

/// Like [`config`], with extra TOML appended (for example `[planner]` overrides).
pub fn config_with(dimensions: u32, extra: &str) -> Result<Config> {
	let raw = format!(
		r#"
[service]
log_level = "debug"

[providers.embedding]
provider_id = "test"
api_base = "http://127.0.0.1:9"
api_key = "test-key"
path = "/embeddings"
model = "hash"
dimensions = {dimensions}
timeout_ms = 1000

[storage]
adapter = "memory"

[storage.qdrant]
url = "http://127.0.0.1:6334"
collection = "quarry_test"
vector_dim = {dimensions}

{extra}
"#
	);

	Ok(quarry_config::from_toml_str(&raw)?)
}

/// Embeds `documents` with `embedder` and stores them in `store`.
pub async fn seed(
	store: &dyn VectorStore,
	embedder: &dyn Embedder,
	documents: &[SeedDocument<'_>],
) -> Result<()> {
	let texts: Vec<String> = documents.iter().map(|(_, content, _)| content.to_string()).collect();
	let vectors = embedder.embed(&texts).await?;

	for ((id, content, metadata), vector) in documents.iter().zip(vectors) {
		let metadata = match metadata {
			Value::Object(map) => map.clone(),
			Value::Null => Default::default(),
			other => {
				return Err(Error::Message(format!(
					"Seed metadata for {id:?} must be an object, got {other}."
				)));
			},
		};

		store.store_document(Document::new(*id, *content).with_metadata(metadata), vector).await?;
	}

	Ok(())
}

/// An in-memory store holding `documents`, embedded with `embedder`.
pub async fn seeded_store(
	embedder: &dyn Embedder,
	documents: &[SeedDocument<'_>],
) -> Result<MemoryStore> {
	let store = MemoryStore::new(embedder.dimensions());

	seed(&store, embedder, documents).await?;

	Ok(store)
}
