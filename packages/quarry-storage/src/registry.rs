use std::{fmt, sync::Arc};

use crate::{Error, MemoryStore, QdrantStore, Result, VectorStore};
use quarry_config::{ADAPTER_MEMORY, ADAPTER_QDRANT, Config};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterKind {
	Qdrant,
	Memory,
}
impl AdapterKind {
	pub const ALL: [Self; 2] = [Self::Qdrant, Self::Memory];

	pub fn parse(raw: &str) -> Result<Self> {
		Self::ALL.into_iter().find(|kind| kind.as_str() == raw.trim()).ok_or_else(|| {
			Error::InvalidArgument(format!(
				"Unknown storage adapter {raw:?}; expected {ADAPTER_QDRANT} or {ADAPTER_MEMORY}."
			))
		})
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Qdrant => ADAPTER_QDRANT,
			Self::Memory => ADAPTER_MEMORY,
		}
	}
}
impl fmt::Display for AdapterKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Opens the store named by `storage.adapter`. The handle is owned by the caller.
pub async fn open(cfg: &Config) -> Result<Arc<dyn VectorStore>> {
	let kind = AdapterKind::parse(&cfg.storage.adapter)?;
	let store: Arc<dyn VectorStore> = match kind {
		AdapterKind::Qdrant => Arc::new(QdrantStore::connect(&cfg.storage.qdrant).await?),
		AdapterKind::Memory => Arc::new(MemoryStore::new(cfg.storage.qdrant.vector_dim)),
	};

	tracing::info!(adapter = %kind, ready = store.is_initialized(), "Vector store opened.");

	Ok(store)
}
