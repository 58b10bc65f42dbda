use serde::{Deserialize, Serialize};

use crate::{Error, QuarryService, Result};
use quarry_domain::{ScoredResult, keywords, scorer};
use quarry_storage::{Hit, MetadataFilter, SimilarityQuery, VectorStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	#[default]
	Semantic,
	Hybrid,
}
impl SearchMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}
}

/// Per-call search knobs. Unset fields fall back to the `[search]` config section.
#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
	pub k: Option<usize>,
	pub filter: Option<MetadataFilter>,
	pub keyword_weight: Option<f32>,
	pub rerank: Option<bool>,
	pub boost_factor: Option<f32>,
}
impl SearchOptions {
	pub fn with_k(k: usize) -> Self {
		Self { k: Some(k), ..Default::default() }
	}
}

struct Resolved {
	k: usize,
	keyword_weight: f32,
	rerank: bool,
	boost_factor: f32,
}

impl QuarryService {
	/// Nearest-neighbor search for `query`, sorted by descending similarity.
	pub async fn semantic_search(
		&self,
		query: &str,
		options: &SearchOptions,
		store: &dyn VectorStore,
	) -> Result<Vec<ScoredResult>> {
		let resolved = self.resolve_options(query, options)?;
		let mut results = self.retrieve(query, resolved.k, options, store).await?;

		results.truncate(resolved.k);

		tracing::debug!(
			mode = SearchMode::Semantic.as_str(),
			k = resolved.k,
			hits = results.len(),
			"Search completed."
		);

		Ok(results)
	}

	/// Semantic retrieval over an enlarged candidate pool, blended with lexical keyword overlap
	/// and optionally reranked by phrase order.
	pub async fn hybrid_search(
		&self,
		query: &str,
		options: &SearchOptions,
		store: &dyn VectorStore,
	) -> Result<Vec<ScoredResult>> {
		let resolved = self.resolve_options(query, options)?;
		let pool = resolved.k.saturating_mul(self.cfg.search.candidate_multiplier as usize);
		let candidates = self.retrieve(query, pool, options, store).await?;
		let query_keywords = keywords::extract_keywords(query);
		let blended: Vec<ScoredResult> = candidates
			.iter()
			.map(|result| {
				let keyword_score = keywords::lexical_overlap_ratio(&query_keywords, &result.content);

				result.with_score(scorer::combine_hybrid_score(
					result.score,
					keyword_score,
					resolved.keyword_weight,
				))
			})
			.collect();
		let mut results = if resolved.rerank {
			scorer::rerank(&blended, resolved.boost_factor, &keywords::terms(query))
		} else {
			scorer::sort_scored(&blended)
		};

		results.truncate(resolved.k);

		tracing::debug!(
			mode = SearchMode::Hybrid.as_str(),
			k = resolved.k,
			candidates = candidates.len(),
			hits = results.len(),
			keyword_weight = resolved.keyword_weight,
			rerank = resolved.rerank,
			"Search completed."
		);

		Ok(results)
	}

	pub async fn search(
		&self,
		mode: SearchMode,
		query: &str,
		options: &SearchOptions,
		store: &dyn VectorStore,
	) -> Result<Vec<ScoredResult>> {
		match mode {
			SearchMode::Semantic => self.semantic_search(query, options, store).await,
			SearchMode::Hybrid => self.hybrid_search(query, options, store).await,
		}
	}

	fn resolve_options(&self, query: &str, options: &SearchOptions) -> Result<Resolved> {
		let defaults = &self.cfg.search;

		if query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let k = options.k.unwrap_or(defaults.top_k as usize);

		if k == 0 {
			return Err(Error::InvalidRequest { message: "k must be greater than zero.".to_string() });
		}

		let keyword_weight = options.keyword_weight.unwrap_or(defaults.keyword_weight);

		if !keyword_weight.is_finite() || !(0.0..=1.0).contains(&keyword_weight) {
			return Err(Error::InvalidRequest {
				message: "keyword_weight must be in the range 0.0-1.0.".to_string(),
			});
		}

		let boost_factor = options.boost_factor.unwrap_or(defaults.boost_factor);

		if !boost_factor.is_finite() || boost_factor < 0.0 {
			return Err(Error::InvalidRequest {
				message: "boost_factor must be a finite number of at least 0.0.".to_string(),
			});
		}

		Ok(Resolved {
			k,
			keyword_weight,
			rerank: options.rerank.unwrap_or(defaults.rerank),
			boost_factor,
		})
	}

	async fn retrieve(
		&self,
		query: &str,
		k: usize,
		options: &SearchOptions,
		store: &dyn VectorStore,
	) -> Result<Vec<ScoredResult>> {
		if !store.is_initialized() {
			let message = "Vector store is not initialized.".to_string();

			tracing::warn!(%message, "Search skipped.");

			return Err(Error::StoreUnavailable { message });
		}

		let vector = self.embed_query(query).await?;
		let similarity = SimilarityQuery { k, filter: options.filter.clone() };
		let hits = store.search_similar(&vector, &similarity).await.map_err(|err| {
			tracing::warn!(error = %err, "Vector store search failed.");

			Error::from(err)
		})?;
		let results: Vec<ScoredResult> = hits.into_iter().map(to_scored_result).collect();

		Ok(scorer::sort_scored(&results))
	}

	async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let texts = vec![query.to_string()];
		let mut vectors = self.providers.embedding.embed(&texts).await.map_err(|err| {
			tracing::warn!(error = %err, "Query embedding failed.");

			Error::from(err)
		})?;

		if vectors.len() != 1 {
			return Err(Error::Embedding {
				message: format!("Expected one query vector, got {}.", vectors.len()),
			});
		}

		let vector = vectors.remove(0);
		let expected = self.cfg.providers.embedding.dimensions as usize;

		if vector.len() != expected {
			return Err(Error::Embedding {
				message: format!(
					"Query vector has {} dimensions, expected {expected}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}
}

fn to_scored_result(hit: Hit) -> ScoredResult {
	ScoredResult::new(hit.document.id, hit.document.content, hit.score)
		.with_metadata(hit.document.metadata)
}
