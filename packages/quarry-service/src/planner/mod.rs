//! Multi-stage query planning: plan generation, stage evaluation, query refinement and the
//! execution loop.

mod evaluate;
mod executor;
mod refine;
mod types;

pub use evaluate::{
	SUGGEST_BROADEN_EMPTY, SUGGEST_BROADEN_LOW_CONFIDENCE, SUGGEST_KEYWORD_PREFIX,
	SUGGEST_REPHRASE,
};
pub use executor::{QueryExecutor, SearchExecutor};
pub use types::{
	EvaluationCriteria, ExecOptions, ExpectedResults, ExpectedResultsOptions, Plan, PlanOptions,
	PlanOutcome, PlanStage, PlanStatus, PlanStrategy, RefinementMethod, RefinementStrategy,
	StageError, StageEvaluation, StageExecutionResult,
};

use std::{
	collections::HashSet,
	time::{Duration, Instant},
};

use time::OffsetDateTime;
use tokio::time as tokio_time;
use uuid::Uuid;

use crate::{Error, Result};
use quarry_domain::{keywords, sort_scored};

const SEED_STAGE_DESCRIPTION: &str = "Initial search for the goal.";

pub struct QueryPlanner {
	cfg: quarry_config::Planner,
}
impl QueryPlanner {
	pub fn new(cfg: quarry_config::Planner) -> Self {
		Self { cfg }
	}

	/// Builds a pending plan with a single seed stage whose query is the goal itself.
	pub fn generate_plan(&self, goal: &str, options: &PlanOptions) -> Result<Plan> {
		let goal = goal.trim();

		if goal.is_empty() {
			return Err(Error::InvalidRequest { message: "goal must be non-empty.".to_string() });
		}

		let expected = &options.expected_results;
		let strategy = &options.strategy;
		let keywords = match expected.keywords.as_ref() {
			Some(supplied) => normalize_keywords(supplied),
			None => keywords::extract_keywords(goal),
		};
		let min_score = unit_value("strategy.confidence", strategy.confidence, self.cfg.min_score)?;
		let min_confidence =
			unit_value("expected_results.min_confidence", expected.min_confidence, min_score)?;
		let min_matches = expected.min_matches.unwrap_or_else(|| {
			(keywords.len() as f32 * self.cfg.min_match_ratio).ceil() as usize
		});
		let max_stages = strategy.max_stages.unwrap_or(self.cfg.max_stages as usize);

		if max_stages == 0 {
			return Err(Error::InvalidRequest {
				message: "max_stages must be greater than zero.".to_string(),
			});
		}

		let refinement = match strategy.refinement {
			Some(refinement) => refinement,
			None => RefinementStrategy::parse(&self.cfg.refinement)?,
		};
		let now = OffsetDateTime::now_utc();
		let plan = Plan {
			id: Uuid::new_v4(),
			goal: goal.to_string(),
			status: PlanStatus::Pending,
			stages: vec![PlanStage {
				stage_number: 0,
				description: SEED_STAGE_DESCRIPTION.to_string(),
				query: goal.to_string(),
				expected_results: ExpectedResults {
					keywords,
					patterns: expected.patterns.clone(),
					min_confidence,
					min_matches,
				},
			}],
			evaluation_criteria: EvaluationCriteria { min_score },
			max_stages,
			refinement,
			created_at: now,
			updated_at: now,
		};

		tracing::debug!(
			plan_id = %plan.id,
			keywords = plan.stages[0].expected_results.keywords.len(),
			min_matches,
			max_stages,
			"Plan generated."
		);

		Ok(plan)
	}

	/// Runs one stage under a deadline. Executor failures and timeouts are folded into the
	/// returned result; only an out-of-range `stage_index` is an error.
	pub async fn execute_single_stage(
		&self,
		plan: &Plan,
		stage_index: usize,
		executor: &dyn QueryExecutor,
		options: &ExecOptions,
	) -> Result<StageExecutionResult> {
		let Some(stage) = plan.stages.get(stage_index) else {
			return Err(Error::InvalidRequest {
				message: format!(
					"Stage index {stage_index} is out of range for a plan with {} stages.",
					plan.stages.len()
				),
			});
		};
		let deadline = options.timeout.unwrap_or(self.base_timeout());
		let budget_left = stage_index + 1 < plan.max_stages;
		let started = Instant::now();
		let outcome = tokio_time::timeout(deadline, executor.execute(&stage.query)).await;
		let elapsed_ms = started.elapsed().as_millis() as u64;
		let execution = match outcome {
			Ok(Ok(results)) => {
				let results = sort_scored(&results);
				let evaluation = self.evaluate_stage(stage, &results);
				let should_continue = !evaluation.is_successful && budget_left;

				StageExecutionResult {
					stage: stage.clone(),
					results,
					evaluation,
					should_continue,
					timed_out: false,
					error: None,
					elapsed_ms,
				}
			},
			Ok(Err(err)) => {
				tracing::warn!(
					plan_id = %plan.id,
					stage = stage.stage_number,
					error = %err,
					"Stage query failed."
				);

				let error = StageError::from(&err);
				let evaluation =
					self.evaluate_failed_stage(stage, &format!("stage query failed ({err})"));

				StageExecutionResult {
					stage: stage.clone(),
					results: Vec::new(),
					evaluation,
					should_continue: error.retryable && budget_left,
					timed_out: false,
					error: Some(error),
					elapsed_ms,
				}
			},
			Err(_) => {
				tracing::warn!(
					plan_id = %plan.id,
					stage = stage.stage_number,
					timeout_ms = deadline.as_millis() as u64,
					"Stage query timed out."
				);

				let evaluation = self.evaluate_failed_stage(
					stage,
					&format!("stage query timed out after {} ms", deadline.as_millis()),
				);

				StageExecutionResult {
					stage: stage.clone(),
					results: Vec::new(),
					evaluation,
					should_continue: true,
					timed_out: true,
					error: None,
					elapsed_ms,
				}
			},
		};

		tracing::debug!(
			plan_id = %plan.id,
			stage = stage.stage_number,
			score = execution.evaluation.score,
			successful = execution.evaluation.is_successful,
			hits = execution.results.len(),
			elapsed_ms,
			"Stage executed."
		);

		Ok(execution)
	}

	/// Drives `plan` to a terminal status, refining the query after each unsuccessful stage
	/// until it succeeds, fails on a non-retryable error, or runs out of stages.
	pub async fn execute_plan(
		&self,
		mut plan: Plan,
		executor: &dyn QueryExecutor,
		options: &ExecOptions,
	) -> Result<PlanOutcome> {
		if plan.status.is_terminal() {
			return Err(Error::InvalidRequest {
				message: format!("Plan {} is already {}.", plan.id, plan.status),
			});
		}
		if plan.stages.is_empty() {
			return Err(Error::InvalidRequest { message: "Plan has no stages.".to_string() });
		}
		if plan.status == PlanStatus::Pending {
			plan.transition(PlanStatus::Running)?;
		}

		tracing::info!(plan_id = %plan.id, goal = %plan.goal, "Plan started.");

		let mut executions = Vec::new();
		let mut deadline = options.timeout.unwrap_or(self.base_timeout());

		while plan.status == PlanStatus::Running {
			if plan.stages.len() > plan.max_stages {
				plan.transition(PlanStatus::Exhausted)?;

				break;
			}

			let index = plan.stages.len() - 1;
			let stage_options = ExecOptions { timeout: Some(deadline) };
			let execution =
				self.execute_single_stage(&plan, index, executor, &stage_options).await?;

			if execution.evaluation.is_successful {
				plan.transition(PlanStatus::Succeeded)?;
			} else if execution.should_continue && plan.stages.len() < plan.max_stages {
				if execution.timed_out {
					deadline = self.next_timeout(deadline);
				}

				let method = self.choose_method(
					plan.refinement,
					&execution.evaluation,
					execution.stage.expected_results.min_matches,
				);
				let query = self.refine_query(&execution.stage.query, &execution.evaluation, method);
				let description =
					format!("Refined stage {} query by {method}.", execution.stage.stage_number);

				plan.push_stage(description, query)?;
			} else if execution.error.as_ref().is_some_and(|error| !error.retryable) {
				plan.transition(PlanStatus::Failed)?;
			} else {
				plan.transition(PlanStatus::Exhausted)?;
			}

			executions.push(execution);
		}

		tracing::info!(
			plan_id = %plan.id,
			status = %plan.status,
			stages = plan.stages.len(),
			"Plan finished."
		);

		Ok(PlanOutcome { plan, executions })
	}

	fn base_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.stage_timeout_ms)
	}

	/// Deadline for the stage after a timeout, grown by the backoff factor and capped.
	fn next_timeout(&self, current: Duration) -> Duration {
		let cap = Duration::from_millis(self.cfg.max_stage_timeout_ms).max(current);
		let grown = current.mul_f32(self.cfg.timeout_backoff.max(1.0));

		grown.min(cap)
	}
}

fn normalize_keywords(supplied: &[String]) -> Vec<String> {
	let mut seen = HashSet::new();

	supplied
		.iter()
		.map(|keyword| keyword.trim().to_lowercase())
		.filter(|keyword| !keyword.is_empty())
		.filter(|keyword| seen.insert(keyword.clone()))
		.collect()
}

fn unit_value(label: &str, value: Option<f32>, default: f32) -> Result<f32> {
	let value = value.unwrap_or(default);

	if !value.is_finite() || !(0.0..=1.0).contains(&value) {
		return Err(Error::InvalidRequest {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(value)
}
