use std::future::Future;

use crate::{BoxFuture, QuarryService, Result, SearchMode, SearchOptions};
use quarry_domain::ScoredResult;
use quarry_storage::VectorStore;

/// Runs one stage query. Implemented for plain async closures and for [`SearchExecutor`].
pub trait QueryExecutor
where
	Self: Send + Sync,
{
	fn execute<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<ScoredResult>>>;
}
impl<F, Fut> QueryExecutor for F
where
	F: Fn(String) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Vec<ScoredResult>>> + Send + 'static,
{
	fn execute<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<ScoredResult>>> {
		Box::pin(self(query.to_string()))
	}
}

/// Executes stage queries through [`QuarryService`] searches against one store.
pub struct SearchExecutor<'a> {
	service: &'a QuarryService,
	store: &'a dyn VectorStore,
	mode: SearchMode,
	options: SearchOptions,
}
impl<'a> SearchExecutor<'a> {
	pub fn new(
		service: &'a QuarryService,
		store: &'a dyn VectorStore,
		mode: SearchMode,
		options: SearchOptions,
	) -> Self {
		Self { service, store, mode, options }
	}
}
impl QueryExecutor for SearchExecutor<'_> {
	fn execute<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<ScoredResult>>> {
		Box::pin(self.service.search(self.mode, query, &self.options, self.store))
	}
}
