mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ADAPTER_MEMORY, ADAPTER_QDRANT, Config, EmbeddingProviderConfig, Planner, Providers, Qdrant,
	Search, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		ParseFailure::Toml(source) => Error::ParseConfig { path: path.to_path_buf(), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	parse(raw).map_err(|err| match err {
		ParseFailure::Toml(source) =>
			Error::ParseConfig { path: std::path::PathBuf::from("<inline>"), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.storage.adapter.as_str(), ADAPTER_QDRANT | ADAPTER_MEMORY) {
		return Err(Error::UnknownVariant {
			field: "storage.adapter",
			value: cfg.storage.adapter.clone(),
			expected: "qdrant or memory",
		});
	}
	if cfg.storage.adapter == ADAPTER_QDRANT && cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}

	validate_search(&cfg.search)?;
	validate_planner(&cfg.planner)?;

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	if search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if search.candidate_multiplier == 0 {
		return Err(Error::Validation {
			message: "search.candidate_multiplier must be greater than zero.".to_string(),
		});
	}

	check_unit_range("search.keyword_weight", search.keyword_weight)?;

	if !search.boost_factor.is_finite() {
		return Err(Error::Validation {
			message: "search.boost_factor must be a finite number.".to_string(),
		});
	}
	if search.boost_factor < 0.0 {
		return Err(Error::Validation {
			message: "search.boost_factor must be zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn validate_planner(planner: &Planner) -> Result<()> {
	if planner.max_stages == 0 {
		return Err(Error::Validation {
			message: "planner.max_stages must be greater than zero.".to_string(),
		});
	}
	if planner.stage_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "planner.stage_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if planner.max_stage_timeout_ms < planner.stage_timeout_ms {
		return Err(Error::Validation {
			message: "planner.max_stage_timeout_ms must be at least planner.stage_timeout_ms."
				.to_string(),
		});
	}
	if !planner.timeout_backoff.is_finite() || planner.timeout_backoff < 1.0 {
		return Err(Error::Validation {
			message: "planner.timeout_backoff must be a finite number of at least 1.0."
				.to_string(),
		});
	}
	if planner.confidence_top_n == 0 {
		return Err(Error::Validation {
			message: "planner.confidence_top_n must be greater than zero.".to_string(),
		});
	}

	check_unit_range("planner.min_score", planner.min_score)?;
	check_unit_range("planner.min_match_ratio", planner.min_match_ratio)?;

	if !matches!(planner.refinement.as_str(), "auto" | "keywords" | "semantic") {
		return Err(Error::UnknownVariant {
			field: "planner.refinement",
			value: planner.refinement.clone(),
			expected: "auto, keywords or semantic",
		});
	}

	Ok(())
}

fn check_unit_range(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

enum ParseFailure {
	Toml(toml::de::Error),
	Invalid(Error),
}

fn parse(raw: &str) -> std::result::Result<Config, ParseFailure> {
	let mut cfg: Config = toml::from_str(raw).map_err(ParseFailure::Toml)?;

	normalize(&mut cfg);

	validate(&cfg).map_err(ParseFailure::Invalid)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.storage.adapter = cfg.storage.adapter.trim().to_ascii_lowercase();
	cfg.planner.refinement = cfg.planner.refinement.trim().to_ascii_lowercase();
}
