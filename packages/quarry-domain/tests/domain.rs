use serde_json::json;

use quarry_domain::{
	ScoredResult,
	keywords::{extract_keywords, lexical_overlap_ratio},
	scorer::{combine_hybrid_score, cosine_similarity, rerank},
	sort_scored,
};

#[test]
fn goal_keywords_cover_compound_identifiers() {
	let keywords = extract_keywords("TypeScript configuration and setup");

	for expected in ["type", "script", "configuration", "setup"] {
		assert!(keywords.iter().any(|keyword| keyword == expected), "missing {expected}");
	}

	assert!(!keywords.iter().any(|keyword| keyword == "and"));
}

#[test]
fn mismatched_dimensions_do_not_panic() {
	let score = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]);

	assert!((score - 5.0 / (5.0_f32.sqrt() * 14.0_f32.sqrt())).abs() < 1e-6);
}

#[test]
fn zero_keyword_weight_preserves_semantic_order() {
	let results = vec![
		ScoredResult::new("a", "rust planner", 0.91),
		ScoredResult::new("b", "nothing relevant", 0.74),
		ScoredResult::new("c", "planner planner planner", -0.20),
		ScoredResult::new("d", "rust", -0.40),
	];
	let terms = extract_keywords("rust planner");
	let combined: Vec<ScoredResult> = results
		.iter()
		.map(|result| {
			let keyword = lexical_overlap_ratio(&terms, &result.content);

			result.with_score(combine_hybrid_score(result.score, keyword, 0.0))
		})
		.collect();
	let ids: Vec<String> = sort_scored(&combined).into_iter().map(|result| result.id).collect();

	assert_eq!(ids, vec!["a", "b", "c", "d"]);
}

#[test]
fn rerank_keeps_metadata() {
	let meta = json!({ "path": "docs/plan.md" }).as_object().cloned().expect("Object fixture.");
	let results = vec![ScoredResult::new("a", "query planner", 0.2).with_metadata(meta.clone())];
	let reranked = rerank(&results, 0.5, &extract_keywords("query planner"));

	assert_eq!(reranked[0].metadata, meta);
	assert!((reranked[0].score - 0.7).abs() < 1e-6);
}
