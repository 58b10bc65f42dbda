use std::{io::Write, path::PathBuf, time::Duration};

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use quarry_config::Config;
use quarry_domain::ScoredResult;
use quarry_service::{
	ExecOptions, ExpectedResultsOptions, PlanOptions, PlanOutcome, PlanStrategy, Providers,
	QuarryService, RefinementStrategy, SearchExecutor, SearchMode, SearchOptions,
};
use quarry_storage::{Document, ListQuery, MetadataFilter, VectorStore, registry};

#[derive(Debug, Parser)]
#[command(
	version = quarry_cli::VERSION,
	rename_all = "kebab",
	styles = quarry_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Runs a single semantic or hybrid search.
	Search(SearchArgs),
	/// Runs a multi-stage plan towards a goal.
	Plan(PlanArgs),
	/// Lists stored documents.
	Docs(DocsArgs),
}

#[derive(Debug, ClapArgs)]
pub struct SearchArgs {
	pub query: String,
	#[arg(long, short = 'k')]
	pub k: Option<usize>,
	#[arg(long)]
	pub hybrid: bool,
	#[arg(long)]
	pub keyword_weight: Option<f32>,
	#[arg(long)]
	pub rerank: bool,
	#[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
	pub filters: Vec<(String, Value)>,
}

#[derive(Debug, ClapArgs)]
pub struct PlanArgs {
	pub goal: String,
	#[arg(long)]
	pub max_stages: Option<usize>,
	#[arg(long)]
	pub timeout_ms: Option<u64>,
	#[arg(long, value_parser = parse_refinement)]
	pub refinement: Option<RefinementStrategy>,
	/// Minimum stage score, overriding `planner.min_score`.
	#[arg(long)]
	pub confidence: Option<f32>,
	/// Expected keyword; repeat to replace the keywords derived from the goal.
	#[arg(long = "keyword")]
	pub keywords: Vec<String>,
	#[arg(long, short = 'k')]
	pub k: Option<usize>,
	#[arg(long)]
	pub hybrid: bool,
	#[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
	pub filters: Vec<(String, Value)>,
}

#[derive(Debug, ClapArgs)]
pub struct DocsArgs {
	#[arg(long, default_value_t = 20)]
	pub limit: usize,
	#[arg(long, default_value_t = 0)]
	pub offset: usize,
	#[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
	pub filters: Vec<(String, Value)>,
}

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
	status: &'a str,
	best_stage: Option<usize>,
	best_results: &'a [ScoredResult],
	#[serde(flatten)]
	outcome: &'a PlanOutcome,
}

#[derive(Debug, Serialize)]
struct DocsReport {
	total: u64,
	documents: Vec<Document>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quarry_config::load(&args.config)?;

	quarry_cli::init_tracing(&config.service.log_level);

	let store = registry::open(&config).await?;

	execute(args.command, config, store.as_ref(), &mut std::io::stdout()).await
}

/// Runs `command` against `store` and writes its JSON report to `out` in a single write once the
/// command has finished.
pub async fn execute(
	command: Command,
	config: Config,
	store: &dyn VectorStore,
	out: &mut dyn Write,
) -> color_eyre::Result<()> {
	match command {
		Command::Search(args) => {
			let service = service(config)?;
			let options = SearchOptions {
				k: args.k,
				filter: build_filter(args.filters)?,
				keyword_weight: args.keyword_weight,
				rerank: args.rerank.then_some(true),
				boost_factor: None,
			};
			let results =
				service.search(search_mode(args.hybrid), &args.query, &options, store).await?;

			tracing::info!(hits = results.len(), "Search finished.");

			write_json(out, &results)
		},
		Command::Plan(args) => {
			let service = service(config)?;
			let planner = service.planner();
			let options = PlanOptions {
				expected_results: ExpectedResultsOptions {
					keywords: (!args.keywords.is_empty()).then_some(args.keywords),
					..Default::default()
				},
				strategy: PlanStrategy {
					confidence: args.confidence,
					max_stages: args.max_stages,
					refinement: args.refinement,
				},
			};
			let plan = planner.generate_plan(&args.goal, &options)?;
			let search_options = SearchOptions {
				k: args.k,
				filter: build_filter(args.filters)?,
				..Default::default()
			};
			let executor =
				SearchExecutor::new(&service, store, search_mode(args.hybrid), search_options);
			let exec_options = ExecOptions { timeout: args.timeout_ms.map(Duration::from_millis) };
			let outcome = planner.execute_plan(plan, &executor, &exec_options).await?;
			let best = outcome.best_execution();
			let report = PlanReport {
				status: outcome.plan.status.as_str(),
				best_stage: best.map(|execution| execution.stage.stage_number),
				best_results: best.map(|execution| execution.results.as_slice()).unwrap_or(&[]),
				outcome: &outcome,
			};

			write_json(out, &report)
		},
		Command::Docs(args) => {
			let filter = build_filter(args.filters)?;
			let total = store.count_documents(filter.as_ref()).await?;
			let query = ListQuery { limit: args.limit, offset: args.offset, filter };
			let documents = store.list_documents(&query).await?;

			write_json(out, &DocsReport { total, documents })
		},
	}
}

fn service(config: Config) -> color_eyre::Result<QuarryService> {
	let providers = Providers::from_config(&config)?;

	Ok(QuarryService::new(config, providers))
}

fn search_mode(hybrid: bool) -> SearchMode {
	if hybrid { SearchMode::Hybrid } else { SearchMode::Semantic }
}

fn build_filter(pairs: Vec<(String, Value)>) -> color_eyre::Result<Option<MetadataFilter>> {
	if pairs.is_empty() {
		return Ok(None);
	}

	let mut filter = MetadataFilter::new();

	for (key, value) in pairs {
		filter.insert(key, value)?;
	}

	Ok(Some(filter))
}

fn write_json<T>(out: &mut dyn Write, value: &T) -> color_eyre::Result<()>
where
	T: Serialize + ?Sized,
{
	let mut rendered = serde_json::to_vec_pretty(value)?;

	rendered.push(b'\n');
	out.write_all(&rendered)?;
	out.flush()?;

	Ok(())
}

fn parse_filter(raw: &str) -> Result<(String, Value), String> {
	MetadataFilter::parse_pair(raw).map_err(|err| err.to_string())
}

fn parse_refinement(raw: &str) -> Result<RefinementStrategy, String> {
	RefinementStrategy::parse(raw).map_err(|err| err.to_string())
}
