use std::cmp::Ordering;

use crate::{ScoredResult, keywords};

pub trait Scored {
	fn score(&self) -> f32;
}

/// Cosine similarity that tolerates mismatched lengths.
///
/// The dot product covers the first `min(a.len(), b.len())` components while each magnitude
/// covers its vector's full length, so `[1, 2]` against `[1, 2, 3]` is about 0.598 rather than
/// 1.0. Indexes built against this behavior rely on it staying that way. Returns 0.0 when either
/// vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	let shared = a.len().min(b.len());
	let dot: f64 =
		a[..shared].iter().zip(&b[..shared]).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
	let norm_a = magnitude(a);
	let norm_b = magnitude(b);

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	(dot / (norm_a * norm_b)) as f32
}

/// Strict variant for callers that want dimension mismatches rejected.
pub fn checked_cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.len() != b.len() {
		return None;
	}

	Some(cosine_similarity(a, b))
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Returns a copy of `items` ordered by descending score. Ties keep their input order and NaN
/// scores go last.
pub fn sort_by_score<T, F>(items: &[T], score: F) -> Vec<T>
where
	T: Clone,
	F: Fn(&T) -> f32,
{
	let mut out = items.to_vec();

	out.sort_by(|left, right| cmp_f32_desc(score(left), score(right)));

	out
}

pub fn sort_scored<T>(items: &[T]) -> Vec<T>
where
	T: Clone + Scored,
{
	sort_by_score(items, |item| item.score())
}

pub fn combine_hybrid_score(semantic_score: f32, keyword_score: f32, keyword_weight: f32) -> f32 {
	let weight = if keyword_weight.is_nan() { 0.0 } else { keyword_weight.clamp(0.0, 1.0) };
	let combined = semantic_score * (1.0 - weight) + keyword_score * weight;

	if combined.is_nan() {
		return 0.0;
	}

	combined.clamp(0.0, 1.0)
}

/// Adds `boost_factor` times the phrase-order overlap with the query to every score and re-sorts.
pub fn rerank(
	results: &[ScoredResult],
	boost_factor: f32,
	query_terms: &[String],
) -> Vec<ScoredResult> {
	let boosted: Vec<ScoredResult> = results
		.iter()
		.map(|result| {
			let signal = keywords::adjacent_pair_ratio(query_terms, &result.content);

			result.with_score(result.score + boost_factor * signal)
		})
		.collect();

	sort_scored(&boosted)
}

fn magnitude(vector: &[f32]) -> f64 {
	vector.iter().map(|value| f64::from(*value) * f64::from(*value)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn approx(actual: f32, expected: f32) {
		assert!((actual - expected).abs() < 1e-3, "expected {expected}, got {actual}");
	}

	#[test]
	fn cosine_of_vector_with_itself_is_one() {
		approx(cosine_similarity(&[0.3, -1.2, 4.0], &[0.3, -1.2, 4.0]), 1.0);
	}

	#[test]
	fn cosine_of_orthogonal_and_opposite_vectors() {
		approx(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
		approx(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
	}

	#[test]
	fn cosine_truncates_dot_but_not_magnitudes() {
		approx(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.598);
		approx(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]), 0.598);
	}

	#[test]
	fn cosine_with_zero_vector_is_zero() {
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
		assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
	}

	#[test]
	fn checked_cosine_rejects_mismatched_dimensions() {
		assert_eq!(checked_cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
		assert!(checked_cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]).is_some());
	}

	#[test]
	fn sort_is_descending_stable_and_non_mutating() {
		let input = vec![
			ScoredResult::new("a", "", 0.2),
			ScoredResult::new("b", "", 0.9),
			ScoredResult::new("c", "", 0.2),
			ScoredResult::new("d", "", f32::NAN),
			ScoredResult::new("e", "", 0.5),
		];
		let snapshot: Vec<String> = input.iter().map(|result| result.id.clone()).collect();
		let sorted = sort_scored(&input);
		let ids: Vec<&str> = sorted.iter().map(|result| result.id.as_str()).collect();

		assert_eq!(ids, vec!["b", "e", "a", "c", "d"]);
		assert_eq!(input.iter().map(|result| result.id.clone()).collect::<Vec<_>>(), snapshot);
	}

	#[test]
	fn sort_of_empty_is_empty() {
		let empty: Vec<ScoredResult> = Vec::new();

		assert!(sort_scored(&empty).is_empty());
	}

	#[test]
	fn sort_by_custom_accessor() {
		let pairs = vec![("low", 1_u32), ("high", 7), ("mid", 3)];
		let sorted = sort_by_score(&pairs, |pair| pair.1 as f32);

		assert_eq!(
			sorted.iter().map(|pair| pair.0).collect::<Vec<_>>(),
			vec!["high", "mid", "low"]
		);
	}

	#[test]
	fn hybrid_score_blends_and_clamps() {
		approx(combine_hybrid_score(0.8, 0.2, 0.0), 0.8);
		approx(combine_hybrid_score(0.8, 0.2, 0.25), 0.65);
		approx(combine_hybrid_score(0.8, 0.2, 1.0), 0.2);
		approx(combine_hybrid_score(1.4, 1.0, 0.3), 1.0);
		approx(combine_hybrid_score(-0.5, 0.0, 0.0), 0.0);
		approx(combine_hybrid_score(0.5, 1.0, 7.0), 1.0);
	}

	#[test]
	fn rerank_boosts_phrase_matches() {
		let terms = vec!["query".to_string(), "planner".to_string()];
		let input = vec![
			ScoredResult::new("plain", "planner notes about a query", 0.50),
			ScoredResult::new("phrase", "the query planner loop", 0.45),
		];
		let reranked = rerank(&input, 0.2, &terms);

		assert_eq!(reranked[0].id, "phrase");
		approx(reranked[0].score, 0.65);
		approx(reranked[1].score, 0.50);
	}

	#[test]
	fn rerank_without_boost_is_idempotent() {
		let terms = vec!["planner".to_string()];
		let input = vec![
			ScoredResult::new("a", "planner", 0.3),
			ScoredResult::new("b", "other", 0.7),
			ScoredResult::new("c", "planner", 0.3),
		];
		let once = rerank(&input, 0.0, &terms);
		let twice = rerank(&once, 0.0, &terms);

		assert_eq!(once, twice);
		assert_eq!(
			once.iter().map(|result| result.id.as_str()).collect::<Vec<_>>(),
			vec!["b", "a", "c"]
		);
	}
}
