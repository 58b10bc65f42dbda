pub mod planner;
pub mod retrieval;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use planner::{
	ExecOptions, ExpectedResults, ExpectedResultsOptions, Plan, PlanOptions, PlanOutcome,
	PlanStage, PlanStatus, PlanStrategy, QueryExecutor, QueryPlanner, RefinementMethod,
	RefinementStrategy, SearchExecutor, StageError, StageEvaluation, StageExecutionResult,
};
pub use retrieval::{SearchMode, SearchOptions};

use std::{future::Future, pin::Pin, sync::Arc};

use quarry_config::Config;
use quarry_providers::{Embedder, HttpEmbedder};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn Embedder>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn Embedder>) -> Self {
		Self { embedding }
	}

	/// Providers backed by the HTTP clients described in `cfg`.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let embedder = HttpEmbedder::new(&cfg.providers.embedding)?;

		Ok(Self::new(Arc::new(embedder)))
	}
}

/// Entry point for retrieval and planning. Holds configuration and providers; vector stores are
/// passed per call and stay owned by the caller.
pub struct QuarryService {
	pub cfg: Config,
	pub providers: Providers,
}
impl QuarryService {
	pub fn new(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers }
	}

	pub fn planner(&self) -> QueryPlanner {
		QueryPlanner::new(self.cfg.planner.clone())
	}
}
