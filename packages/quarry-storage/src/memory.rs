use std::sync::RwLock;

use crate::{
	BoxFuture, Document, Error, Hit, ListQuery, MetadataFilter, Result, SimilarityQuery,
	VectorStore,
};
use quarry_domain::scorer;

struct Entry {
	document: Document,
	vector: Vec<f32>,
}

/// Process-local store with brute-force cosine search. Documents keep insertion order; storing an
/// existing id replaces it in place.
pub struct MemoryStore {
	vector_dim: usize,
	entries: RwLock<Vec<Entry>>,
}
impl MemoryStore {
	pub fn new(vector_dim: u32) -> Self {
		Self { vector_dim: vector_dim as usize, entries: RwLock::new(Vec::new()) }
	}

	pub fn len(&self) -> usize {
		self.entries.read().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn search(&self, vector: &[f32], query: &SimilarityQuery) -> Result<Vec<Hit>> {
		if query.k == 0 {
			return Err(Error::InvalidArgument("k must be greater than zero.".to_string()));
		}

		let entries = self.entries.read().unwrap_or_else(|err| err.into_inner());
		let hits: Vec<Hit> = entries
			.iter()
			.filter(|entry| passes(query.filter.as_ref(), &entry.document))
			.map(|entry| Hit {
				document: entry.document.clone(),
				score: scorer::cosine_similarity(vector, &entry.vector),
			})
			.collect();
		let mut hits = scorer::sort_by_score(&hits, |hit| hit.score);

		hits.truncate(query.k);

		Ok(hits)
	}

	fn count(&self, filter: Option<&MetadataFilter>) -> u64 {
		let entries = self.entries.read().unwrap_or_else(|err| err.into_inner());

		entries.iter().filter(|entry| passes(filter, &entry.document)).count() as u64
	}

	fn list(&self, query: &ListQuery) -> Vec<Document> {
		let entries = self.entries.read().unwrap_or_else(|err| err.into_inner());

		entries
			.iter()
			.filter(|entry| passes(query.filter.as_ref(), &entry.document))
			.skip(query.offset)
			.take(query.limit)
			.map(|entry| entry.document.clone())
			.collect()
	}

	fn insert(&self, document: Document, vector: Vec<f32>) -> Result<()> {
		if vector.len() != self.vector_dim {
			return Err(Error::InvalidArgument(format!(
				"Vector for {:?} has {} dimensions, expected {}.",
				document.id,
				vector.len(),
				self.vector_dim
			)));
		}

		let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());

		match entries.iter_mut().find(|entry| entry.document.id == document.id) {
			Some(entry) => {
				entry.document = document;
				entry.vector = vector;
			},
			None => entries.push(Entry { document, vector }),
		}

		Ok(())
	}

	fn remove(&self, id: &str) -> bool {
		let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
		let before = entries.len();

		entries.retain(|entry| entry.document.id != id);

		entries.len() != before
	}
}
impl VectorStore for MemoryStore {
	fn is_initialized(&self) -> bool {
		true
	}

	fn search_similar<'a>(
		&'a self,
		vector: &'a [f32],
		query: &'a SimilarityQuery,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(async move { self.search(vector, query) })
	}

	fn count_documents<'a>(
		&'a self,
		filter: Option<&'a MetadataFilter>,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(self.count(filter)) })
	}

	fn list_documents<'a>(&'a self, query: &'a ListQuery) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move { Ok(self.list(query)) })
	}

	fn store_document<'a>(
		&'a self,
		document: Document,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.insert(document, vector) })
	}

	fn remove_document<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.remove(id)) })
	}
}

fn passes(filter: Option<&MetadataFilter>, document: &Document) -> bool {
	filter.map(|filter| filter.matches(&document.metadata)).unwrap_or(true)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replaces_documents_with_the_same_id() {
		let store = MemoryStore::new(2);

		store.insert(Document::new("a", "first"), vec![1.0, 0.0]).expect("insert");
		store.insert(Document::new("a", "second"), vec![0.0, 1.0]).expect("insert");

		assert_eq!(store.len(), 1);
		assert_eq!(store.list(&ListQuery::default())[0].content, "second");
	}

	#[test]
	fn rejects_vectors_of_the_wrong_dimension() {
		let store = MemoryStore::new(3);
		let err = store.insert(Document::new("a", "x"), vec![1.0]).expect_err("Expected error.");

		assert!(matches!(err, Error::InvalidArgument(_)));
		assert!(store.is_empty());
	}

	#[test]
	fn search_rejects_zero_k() {
		let store = MemoryStore::new(2);
		let err = store
			.search(&[1.0, 0.0], &SimilarityQuery { k: 0, filter: None })
			.expect_err("Expected error.");

		assert!(matches!(err, Error::InvalidArgument(_)));
	}
}
