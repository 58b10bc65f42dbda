use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use quarry_config::Error;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn without_section(section: &str) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	root.as_table_mut().expect("Template config must be a table.").remove(section);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("quarry_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn expect_validation_message(payload: String, needle: &str) {
	let err = quarry_config::from_toml_str(&payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn loads_sample_config_from_disk() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Sample config must load.");

	assert_eq!(cfg.storage.adapter, "memory");
	assert_eq!(cfg.providers.embedding.dimensions, 8);
	assert_eq!(cfg.planner.max_stages, 3);
	assert!((cfg.search.keyword_weight - 0.3).abs() < f32::EPSILON);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("quarry_config_test_does_not_exist.toml");
	let err = quarry_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_toml_reports_parse_error() {
	let path = write_temp_config("[service\nlog_level = ".to_string());
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert!(matches!(result, Err(Error::ParseConfig { .. })));
}

#[test]
fn search_and_planner_sections_are_optional() {
	let payload = without_section("planner");
	let mut root: Value = toml::from_str(&payload).expect("Failed to parse payload.");

	root.as_table_mut().expect("Payload must be a table.").remove("search");

	let payload = toml::to_string(&root).expect("Failed to render payload.");
	let cfg = quarry_config::from_toml_str(&payload).expect("Config without defaults must load.");

	assert_eq!(cfg.search.top_k, 10);
	assert_eq!(cfg.search.candidate_multiplier, 3);
	assert_eq!(cfg.planner.stage_timeout_ms, 30_000);
	assert_eq!(cfg.planner.refinement, "auto");
	assert!((cfg.planner.min_score - 0.6).abs() < f32::EPSILON);
}

#[test]
fn dimensions_must_match_vector_dim() {
	expect_validation_message(
		sample_toml_with("storage.qdrant", "vector_dim", Value::Integer(16)),
		"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
	);
}

#[test]
fn api_key_must_be_non_empty() {
	expect_validation_message(
		sample_toml_with("providers.embedding", "api_key", Value::String("  ".to_string())),
		"api_key must be non-empty.",
	);
}

#[test]
fn adapter_is_normalized_and_checked() {
	let cfg = quarry_config::from_toml_str(&sample_toml_with(
		"storage",
		"adapter",
		Value::String(" Qdrant ".to_string()),
	))
	.expect("Adapter names are case-insensitive.");

	assert_eq!(cfg.storage.adapter, "qdrant");

	let err = quarry_config::from_toml_str(&sample_toml_with(
		"storage",
		"adapter",
		Value::String("pinecone".to_string()),
	))
	.expect_err("Expected unknown adapter error.");

	assert!(matches!(err, Error::UnknownVariant { field: "storage.adapter", .. }));
}

#[test]
fn keyword_weight_must_be_in_unit_range() {
	expect_validation_message(
		sample_toml_with("search", "keyword_weight", Value::Float(1.5)),
		"search.keyword_weight must be in the range 0.0-1.0.",
	);
}

#[test]
fn boost_factor_must_not_be_negative() {
	expect_validation_message(
		sample_toml_with("search", "boost_factor", Value::Float(-0.1)),
		"search.boost_factor must be zero or greater.",
	);
}

#[test]
fn max_stages_must_be_positive() {
	expect_validation_message(
		sample_toml_with("planner", "max_stages", Value::Integer(0)),
		"planner.max_stages must be greater than zero.",
	);
}

#[test]
fn max_stage_timeout_must_cover_stage_timeout() {
	expect_validation_message(
		sample_toml_with("planner", "max_stage_timeout_ms", Value::Integer(1_000)),
		"planner.max_stage_timeout_ms must be at least planner.stage_timeout_ms.",
	);
}

#[test]
fn timeout_backoff_must_not_shrink_deadlines() {
	expect_validation_message(
		sample_toml_with("planner", "timeout_backoff", Value::Float(0.5)),
		"planner.timeout_backoff must be a finite number of at least 1.0.",
	);
}

#[test]
fn refinement_must_be_known() {
	let err = quarry_config::from_toml_str(&sample_toml_with(
		"planner",
		"refinement",
		Value::String("llm".to_string()),
	))
	.expect_err("Expected unknown refinement error.");

	assert!(matches!(err, Error::UnknownVariant { field: "planner.refinement", .. }));
}

#[test]
fn blank_log_level_falls_back_to_info() {
	let cfg = quarry_config::from_toml_str(&sample_toml_with(
		"service",
		"log_level",
		Value::String(" ".to_string()),
	))
	.expect("Blank log level must normalize.");

	assert_eq!(cfg.service.log_level, "info");
}
