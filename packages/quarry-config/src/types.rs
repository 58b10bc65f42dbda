use serde::Deserialize;
use serde_json::{Map, Value};

pub const ADAPTER_QDRANT: &str = "qdrant";
pub const ADAPTER_MEMORY: &str = "memory";

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub planner: Planner,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// Vector store adapter name. One of "qdrant" or "memory".
	pub adapter: String,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

/// Defaults for single-shot retrieval. Request options override these per call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub top_k: u32,
	/// Share of the hybrid score taken by lexical keyword overlap.
	pub keyword_weight: f32,
	pub rerank: bool,
	pub boost_factor: f32,
	/// Hybrid search pulls `top_k * candidate_multiplier` semantic hits before re-scoring.
	pub candidate_multiplier: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			top_k: 10,
			keyword_weight: 0.3,
			rerank: false,
			boost_factor: 0.1,
			candidate_multiplier: 3,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Planner {
	pub max_stages: u32,
	pub stage_timeout_ms: u64,
	pub max_stage_timeout_ms: u64,
	/// Multiplier applied to the stage deadline after a timed out stage.
	pub timeout_backoff: f32,
	pub min_score: f32,
	/// Fraction of derived keywords a stage must match, rounded up.
	pub min_match_ratio: f32,
	/// Number of top results averaged into a stage's confidence.
	pub confidence_top_n: u32,
	/// One of "auto", "keywords" or "semantic".
	pub refinement: String,
}
impl Default for Planner {
	fn default() -> Self {
		Self {
			max_stages: 3,
			stage_timeout_ms: 30_000,
			max_stage_timeout_ms: 120_000,
			timeout_backoff: 2.0,
			min_score: 0.6,
			min_match_ratio: 0.5,
			confidence_top_n: 3,
			refinement: "auto".to_string(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
