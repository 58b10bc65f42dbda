use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use quarry_domain::ScoredResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
	Pending,
	Running,
	Succeeded,
	Failed,
	Exhausted,
}
impl PlanStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Running => "running",
			Self::Succeeded => "succeeded",
			Self::Failed => "failed",
			Self::Exhausted => "exhausted",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Succeeded | Self::Failed | Self::Exhausted)
	}

	fn can_become(self, next: Self) -> bool {
		match self {
			Self::Pending => next == Self::Running,
			Self::Running => next.is_terminal(),
			_ => false,
		}
	}
}
impl fmt::Display for PlanStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How a single refinement rewrites a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementMethod {
	Keywords,
	Semantic,
}
impl RefinementMethod {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Keywords => "keywords",
			Self::Semantic => "semantic",
		}
	}
}
impl fmt::Display for RefinementMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Plan-level refinement choice. `Auto` picks a method per stage from what fell short.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStrategy {
	#[default]
	Auto,
	Keywords,
	Semantic,
}
impl RefinementStrategy {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"auto" => Ok(Self::Auto),
			"keywords" => Ok(Self::Keywords),
			"semantic" => Ok(Self::Semantic),
			other => Err(Error::InvalidRequest {
				message: format!(
					"Unknown refinement strategy {other:?}; expected auto, keywords or semantic."
				),
			}),
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Auto => "auto",
			Self::Keywords => "keywords",
			Self::Semantic => "semantic",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpectedResults {
	pub keywords: Vec<String>,
	#[serde(default)]
	pub patterns: Vec<String>,
	pub min_confidence: f32,
	pub min_matches: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
	pub min_score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStage {
	pub stage_number: usize,
	pub description: String,
	pub query: String,
	pub expected_results: ExpectedResults,
}

/// A multi-stage search session. Stages are append-only and numbered from zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
	pub id: Uuid,
	pub goal: String,
	pub status: PlanStatus,
	pub stages: Vec<PlanStage>,
	pub evaluation_criteria: EvaluationCriteria,
	pub max_stages: usize,
	pub refinement: RefinementStrategy,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl Plan {
	/// Moves the plan forward. Backward moves and moves out of a terminal status are rejected.
	pub fn transition(&mut self, next: PlanStatus) -> Result<()> {
		if !self.status.can_become(next) {
			return Err(Error::InvalidRequest {
				message: format!("Plan cannot move from {} to {next}.", self.status),
			});
		}

		self.status = next;

		self.touch();

		Ok(())
	}

	pub fn current_stage(&self) -> Option<&PlanStage> {
		self.stages.last()
	}

	pub(crate) fn push_stage(&mut self, description: String, query: String) -> Result<&PlanStage> {
		let Some(previous) = self.stages.last() else {
			return Err(Error::InvalidRequest { message: "Plan has no stages.".to_string() });
		};
		let stage = PlanStage {
			stage_number: previous.stage_number + 1,
			description,
			query,
			expected_results: previous.expected_results.clone(),
		};

		self.stages.push(stage);

		self.touch();

		Ok(&self.stages[self.stages.len() - 1])
	}

	fn touch(&mut self) {
		self.updated_at = OffsetDateTime::now_utc();
	}
}

/// Caller overrides for the seed stage's expectations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExpectedResultsOptions {
	pub keywords: Option<Vec<String>>,
	#[serde(default)]
	pub patterns: Vec<String>,
	pub min_confidence: Option<f32>,
	pub min_matches: Option<usize>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanStrategy {
	/// Overrides `planner.min_score` for this plan.
	pub confidence: Option<f32>,
	pub max_stages: Option<usize>,
	pub refinement: Option<RefinementStrategy>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanOptions {
	#[serde(default)]
	pub expected_results: ExpectedResultsOptions,
	#[serde(default)]
	pub strategy: PlanStrategy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageEvaluation {
	pub score: f32,
	pub keyword_matches: usize,
	pub confidence: f32,
	pub feedback: String,
	pub is_successful: bool,
	pub suggestions: Vec<String>,
	pub missing_keywords: Vec<String>,
	pub pattern_matches: usize,
}

/// An executor failure absorbed into a stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
	pub message: String,
	pub retryable: bool,
}
impl From<&Error> for StageError {
	fn from(err: &Error) -> Self {
		Self { message: err.to_string(), retryable: err.is_retryable() }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageExecutionResult {
	pub stage: PlanStage,
	pub results: Vec<ScoredResult>,
	pub evaluation: StageEvaluation,
	pub should_continue: bool,
	pub timed_out: bool,
	pub error: Option<StageError>,
	pub elapsed_ms: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ExecOptions {
	/// Stage deadline. Defaults to `planner.stage_timeout_ms`.
	pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanOutcome {
	pub plan: Plan,
	pub executions: Vec<StageExecutionResult>,
}
impl PlanOutcome {
	/// Highest-scoring execution; the earliest wins ties.
	pub fn best_execution(&self) -> Option<&StageExecutionResult> {
		let mut best: Option<&StageExecutionResult> = None;

		for execution in &self.executions {
			if best.is_none_or(|current| execution.evaluation.score > current.evaluation.score) {
				best = Some(execution);
			}
		}

		best
	}

	pub fn succeeded(&self) -> bool {
		self.plan.status == PlanStatus::Succeeded
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn plan(status: PlanStatus) -> Plan {
		let now = OffsetDateTime::now_utc();

		Plan {
			id: Uuid::new_v4(),
			goal: "goal".to_string(),
			status,
			stages: vec![PlanStage {
				stage_number: 0,
				description: "seed".to_string(),
				query: "goal".to_string(),
				expected_results: ExpectedResults {
					keywords: vec!["goal".to_string()],
					patterns: Vec::new(),
					min_confidence: 0.6,
					min_matches: 1,
				},
			}],
			evaluation_criteria: EvaluationCriteria { min_score: 0.6 },
			max_stages: 3,
			refinement: RefinementStrategy::Auto,
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn status_only_moves_forward() {
		let mut plan = plan(PlanStatus::Pending);

		assert!(plan.transition(PlanStatus::Succeeded).is_err());

		plan.transition(PlanStatus::Running).expect("pending to running");
		plan.transition(PlanStatus::Exhausted).expect("running to exhausted");

		assert!(plan.transition(PlanStatus::Running).is_err());
		assert!(plan.transition(PlanStatus::Succeeded).is_err());
		assert_eq!(plan.status, PlanStatus::Exhausted);
	}

	#[test]
	fn appended_stages_are_contiguous_and_inherit_expectations() {
		let mut plan = plan(PlanStatus::Running);
		let stage = plan
			.push_stage("refined".to_string(), "goal refined".to_string())
			.expect("push")
			.clone();

		assert_eq!(stage.stage_number, 1);
		assert_eq!(stage.expected_results, plan.stages[0].expected_results);
	}

	#[test]
	fn plan_round_trips_through_json_with_rfc3339_timestamps() {
		let plan = plan(PlanStatus::Pending);
		let json = serde_json::to_value(&plan).expect("serialize");

		assert_eq!(json["status"], "pending");
		assert!(json["created_at"].as_str().is_some_and(|raw| raw.contains('T')));

		let decoded: Plan = serde_json::from_value(json).expect("deserialize");

		assert_eq!(decoded, plan);
	}

	#[test]
	fn parses_refinement_strategies() {
		assert_eq!(
			RefinementStrategy::parse(" Keywords ").expect("parse"),
			RefinementStrategy::Keywords
		);
		assert!(RefinementStrategy::parse("random").is_err());
	}
}
