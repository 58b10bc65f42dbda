pub mod filter;
pub mod memory;
pub mod qdrant;
pub mod registry;

mod error;

pub use error::Error;
pub use filter::MetadataFilter;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
pub use registry::AdapterKind;

use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stored unit of text together with its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: String,
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}
impl Document {
	pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
		Self { id: id.into(), content: content.into(), metadata: Map::new() }
	}

	pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
		self.metadata = metadata;

		self
	}
}

/// A nearest-neighbor hit. `score` is the store's similarity, higher is closer.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
	pub document: Document,
	pub score: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SimilarityQuery {
	pub k: usize,
	pub filter: Option<MetadataFilter>,
}

#[derive(Clone, Debug)]
pub struct ListQuery {
	pub limit: usize,
	pub offset: usize,
	pub filter: Option<MetadataFilter>,
}
impl Default for ListQuery {
	fn default() -> Self {
		Self { limit: 20, offset: 0, filter: None }
	}
}

pub trait VectorStore: Send + Sync {
	/// Whether the backing index is reachable and ready for reads.
	fn is_initialized(&self) -> bool;

	fn search_similar<'a>(
		&'a self,
		vector: &'a [f32],
		query: &'a SimilarityQuery,
	) -> BoxFuture<'a, Result<Vec<Hit>>>;

	fn count_documents<'a>(
		&'a self,
		filter: Option<&'a MetadataFilter>,
	) -> BoxFuture<'a, Result<u64>>;

	fn list_documents<'a>(&'a self, query: &'a ListQuery) -> BoxFuture<'a, Result<Vec<Document>>>;

	fn store_document<'a>(
		&'a self,
		document: Document,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<()>>;

	/// Returns whether a document with `id` existed.
	fn remove_document<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>>;
}
