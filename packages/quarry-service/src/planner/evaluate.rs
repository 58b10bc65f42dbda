use regex::RegexBuilder;

use crate::planner::{PlanStage, QueryPlanner, StageEvaluation};
use quarry_domain::{ScoredResult, sort_scored};

pub const SUGGEST_BROADEN_EMPTY: &str =
	"broaden scope: no results were returned, try fewer or more general terms";
pub const SUGGEST_BROADEN_LOW_CONFIDENCE: &str =
	"broaden scope: result confidence is low, try a more general query";
pub const SUGGEST_KEYWORD_PREFIX: &str = "add more specific keyword: ";
pub const SUGGEST_REPHRASE: &str = "rephrase with alternate terminology";

impl QueryPlanner {
	/// Scores `results` against the stage's own expectations.
	pub fn evaluate_stage(&self, stage: &PlanStage, results: &[ScoredResult]) -> StageEvaluation {
		self.assess(stage, results, None)
	}

	/// Evaluation of a stage that produced no results because its query timed out or failed.
	/// `reason` leads the failing criteria and the stage is never successful.
	pub(crate) fn evaluate_failed_stage(
		&self,
		stage: &PlanStage,
		reason: &str,
	) -> StageEvaluation {
		self.assess(stage, &[], Some(reason))
	}

	fn assess(
		&self,
		stage: &PlanStage,
		results: &[ScoredResult],
		failure: Option<&str>,
	) -> StageEvaluation {
		let expected = &stage.expected_results;
		let contents: Vec<String> =
			results.iter().map(|result| result.content.to_lowercase()).collect();
		let mut missing_keywords = Vec::new();
		let mut keyword_matches = 0;

		for keyword in &expected.keywords {
			let needle = keyword.to_lowercase();

			if contents.iter().any(|content| content.contains(&needle)) {
				keyword_matches += 1;
			} else {
				missing_keywords.push(keyword.clone());
			}
		}

		let pattern_matches = expected
			.patterns
			.iter()
			.filter(|pattern| pattern_found(pattern, &contents))
			.count();
		let confidence = self.confidence(results);
		let score = if expected.keywords.is_empty() {
			confidence
		} else {
			let ratio = keyword_matches as f32 / expected.min_matches.max(1) as f32;

			(0.5 * ratio.min(1.0) + 0.5 * confidence).clamp(0.0, 1.0)
		};
		let score_ok = score >= expected.min_confidence;
		let matches_ok = keyword_matches >= expected.min_matches;
		let is_successful = failure.is_none() && score_ok && matches_ok;
		let feedback = if is_successful {
			format!(
				"Stage {} met expectations: score {score:.2}, {keyword_matches}/{} keywords matched.",
				stage.stage_number,
				expected.keywords.len()
			)
		} else {
			let mut failing: Vec<String> = failure.map(str::to_string).into_iter().collect();

			if !score_ok {
				failing.push(format!("score {score:.2} < {:.2}", expected.min_confidence));
			}
			if !matches_ok {
				failing.push(format!(
					"keyword matches {keyword_matches} < {}",
					expected.min_matches
				));
			}

			format!("Results below expected thresholds: {}.", failing.join("; "))
		};
		let mut suggestions = Vec::new();

		if !is_successful {
			if results.is_empty() {
				suggestions.push(SUGGEST_BROADEN_EMPTY.to_string());
			} else if confidence < expected.min_confidence {
				suggestions.push(SUGGEST_BROADEN_LOW_CONFIDENCE.to_string());
			}

			for keyword in &missing_keywords {
				suggestions.push(format!("{SUGGEST_KEYWORD_PREFIX}{keyword}"));
			}

			if !score_ok && keyword_matches > 0 {
				suggestions.push(SUGGEST_REPHRASE.to_string());
			}
		}

		StageEvaluation {
			score,
			keyword_matches,
			confidence,
			feedback,
			is_successful,
			suggestions,
			missing_keywords,
			pattern_matches,
		}
	}

	/// Mean of the top `confidence_top_n` scores, clamped to `[0, 1]`.
	fn confidence(&self, results: &[ScoredResult]) -> f32 {
		let top_n = self.cfg.confidence_top_n.max(1) as usize;
		let sorted = sort_scored(results);
		let top: Vec<f32> =
			sorted.iter().take(top_n).map(|result| result.score).filter(|s| !s.is_nan()).collect();

		if top.is_empty() {
			return 0.0;
		}

		(top.iter().sum::<f32>() / top.len() as f32).clamp(0.0, 1.0)
	}
}

/// Case-insensitive regex match, or a literal substring match when the pattern is not a valid
/// regex.
fn pattern_found(pattern: &str, lowered_contents: &[String]) -> bool {
	match RegexBuilder::new(pattern).case_insensitive(true).build() {
		Ok(regex) => lowered_contents.iter().any(|content| regex.is_match(content)),
		Err(_) => {
			let needle = pattern.to_lowercase();

			lowered_contents.iter().any(|content| content.contains(&needle))
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::planner::ExpectedResults;

	fn planner() -> QueryPlanner {
		QueryPlanner::new(quarry_config::Planner::default())
	}

	fn stage(keywords: &[&str], min_matches: usize, min_confidence: f32) -> PlanStage {
		PlanStage {
			stage_number: 0,
			description: "seed".to_string(),
			query: "query".to_string(),
			expected_results: ExpectedResults {
				keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
				patterns: Vec::new(),
				min_confidence,
				min_matches,
			},
		}
	}

	#[test]
	fn low_score_result_against_high_match_bar_is_below_expected() {
		let stage = stage(&["vector"], 10, 0.6);
		let results = vec![ScoredResult::new("a", "nothing relevant", 0.1)];
		let evaluation = planner().evaluate_stage(&stage, &results);

		assert!(!evaluation.is_successful);
		assert!(evaluation.feedback.contains("below expected"));
		assert_eq!(evaluation.missing_keywords, vec!["vector".to_string()]);
		assert!(
			evaluation.suggestions.iter().any(|s| s == &format!("{SUGGEST_KEYWORD_PREFIX}vector"))
		);
	}

	#[test]
	fn failed_stage_is_below_expected_even_with_trivial_criteria() {
		let stage = stage(&[], 0, 0.0);
		let planner = planner();

		assert!(planner.evaluate_stage(&stage, &[]).is_successful);

		let evaluation = planner.evaluate_failed_stage(&stage, "stage query timed out after 20 ms");

		assert!(!evaluation.is_successful);
		assert_eq!(
			evaluation.feedback,
			"Results below expected thresholds: stage query timed out after 20 ms."
		);
		assert_eq!(evaluation.suggestions, vec![SUGGEST_BROADEN_EMPTY.to_string()]);
	}

	#[test]
	fn confidence_is_mean_of_top_three() {
		let stage = stage(&[], 0, 0.5);
		let results = vec![
			ScoredResult::new("a", "", 0.9),
			ScoredResult::new("b", "", 0.1),
			ScoredResult::new("c", "", 0.8),
			ScoredResult::new("d", "", 0.7),
		];
		let evaluation = planner().evaluate_stage(&stage, &results);

		assert!((evaluation.confidence - 0.8).abs() < 1e-6);
		assert!((evaluation.score - 0.8).abs() < 1e-6);
		assert!(evaluation.is_successful);
	}

	#[test]
	fn score_blends_keyword_ratio_and_confidence() {
		let stage = stage(&["type", "script", "setup", "guide"], 2, 0.6);
		let results = vec![
			ScoredResult::new("a", "TypeScript setup", 0.4),
			ScoredResult::new("b", "Other", 0.2),
		];
		let evaluation = planner().evaluate_stage(&stage, &results);

		assert_eq!(evaluation.keyword_matches, 3);
		assert!((evaluation.confidence - 0.3).abs() < 1e-6);
		assert!((evaluation.score - 0.65).abs() < 1e-6);
		assert!(evaluation.is_successful);
		assert!(evaluation.suggestions.is_empty());
	}

	#[test]
	fn empty_results_suggest_broadening() {
		let stage = stage(&["cache"], 1, 0.6);
		let evaluation = planner().evaluate_stage(&stage, &[]);

		assert_eq!(evaluation.score, 0.0);
		assert_eq!(evaluation.confidence, 0.0);
		assert_eq!(evaluation.suggestions[0], SUGGEST_BROADEN_EMPTY);
	}

	#[test]
	fn low_score_with_matches_suggests_rephrasing() {
		let stage = stage(&["cache", "eviction"], 1, 0.9);
		let results = vec![ScoredResult::new("a", "cache layer", 0.2)];
		let evaluation = planner().evaluate_stage(&stage, &results);

		assert!(!evaluation.is_successful);
		assert!(evaluation.suggestions.iter().any(|s| s == SUGGEST_REPHRASE));
	}

	#[test]
	fn counts_regex_and_literal_patterns() {
		let mut stage = stage(&[], 0, 0.0);

		stage.expected_results.patterns =
			vec![r"fn \w+\(".to_string(), "[unclosed".to_string(), "absent".to_string()];

		let results = vec![ScoredResult::new("a", "pub FN parse( [unclosed bracket", 0.5)];
		let evaluation = planner().evaluate_stage(&stage, &results);

		assert_eq!(evaluation.pattern_matches, 2);
	}
}
