use std::collections::HashSet;

use crate::planner::{
	QueryPlanner, RefinementMethod, RefinementStrategy, StageEvaluation,
	evaluate::SUGGEST_KEYWORD_PREFIX,
};
use quarry_domain::keywords;

const PREFIX_NO_RESULTS: &str = "overview of";
const PREFIX_NO_MATCHES: &str = "concepts related to";
const PREFIX_LOW_SCORE: &str = "explanation and examples of";

impl QueryPlanner {
	/// Rewrites `query` after an unsuccessful evaluation. The output always differs from the input
	/// and is never shorter.
	pub fn refine_query(
		&self,
		query: &str,
		evaluation: &StageEvaluation,
		method: RefinementMethod,
	) -> String {
		match method {
			RefinementMethod::Keywords => refine_with_keywords(query, evaluation),
			RefinementMethod::Semantic => refine_semantically(query, evaluation),
		}
	}

	/// Resolves a plan strategy to the method used for the next stage.
	pub fn choose_method(
		&self,
		strategy: RefinementStrategy,
		evaluation: &StageEvaluation,
		min_matches: usize,
	) -> RefinementMethod {
		match strategy {
			RefinementStrategy::Keywords => RefinementMethod::Keywords,
			RefinementStrategy::Semantic => RefinementMethod::Semantic,
			RefinementStrategy::Auto =>
				if evaluation.keyword_matches < min_matches {
					RefinementMethod::Keywords
				} else {
					RefinementMethod::Semantic
				},
		}
	}
}

fn refine_with_keywords(query: &str, evaluation: &StageEvaluation) -> String {
	let present: HashSet<String> = keywords::terms(query).into_iter().collect();
	let lowered = query.to_lowercase();
	let mut additions: Vec<&str> = Vec::new();
	let absent = |term: &str, additions: &[&str]| {
		let term_lower = term.to_lowercase();

		!present.contains(&term_lower)
			&& !lowered.contains(&term_lower)
			&& !additions.iter().any(|added| added.eq_ignore_ascii_case(term))
	};

	for keyword in &evaluation.missing_keywords {
		if absent(keyword, &additions) {
			additions.push(keyword);
		}
	}

	if additions.is_empty() {
		for suggestion in &evaluation.suggestions {
			if let Some(term) = suggestion.strip_prefix(SUGGEST_KEYWORD_PREFIX)
				&& absent(term, &additions)
			{
				additions.push(term);
			}
		}
	}

	if additions.is_empty() {
		return format!("\"{query}\"");
	}
	if query.is_empty() || query.ends_with(char::is_whitespace) {
		return format!("{query}{}", additions.join(" "));
	}

	format!("{query} {}", additions.join(" "))
}

fn refine_semantically(query: &str, evaluation: &StageEvaluation) -> String {
	let prefix = if evaluation.confidence == 0.0 {
		PREFIX_NO_RESULTS
	} else if evaluation.keyword_matches == 0 {
		PREFIX_NO_MATCHES
	} else {
		PREFIX_LOW_SCORE
	};

	format!("{prefix} {query}")
}
