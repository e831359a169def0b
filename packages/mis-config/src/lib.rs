mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Dedup, EmbeddingProviderConfig, Eval, Providers, Recommend, Retrieval, Service, Tagging,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;

	if embedding.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_base must be non-empty.".to_string(),
		});
	}
	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &embedding.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("providers.embedding.default_headers.{key} must be a string."),
			});
		}
	}

	if !matches!(cfg.retrieval.mode.as_str(), "sparse" | "dense" | "hybrid") {
		return Err(Error::Validation {
			message: "retrieval.mode must be one of sparse, dense, or hybrid.".to_string(),
		});
	}
	if !cfg.retrieval.alpha.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.alpha must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.retrieval.alpha) {
		return Err(Error::Validation {
			message: "retrieval.alpha must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, value) in [
		("retrieval.top_k", cfg.retrieval.top_k),
		("retrieval.sparse_k", cfg.retrieval.sparse_k),
		("retrieval.dense_k", cfg.retrieval.dense_k),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if let Some(quality) = cfg.retrieval.search_quality
		&& quality == 0
	{
		return Err(Error::Validation {
			message: "retrieval.search_quality must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("dedup.sim_threshold", cfg.dedup.sim_threshold),
		("tagging.threshold", cfg.tagging.threshold),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(-1.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range -1.0-1.0."),
			});
		}
	}

	if cfg.tagging.top_n == 0 {
		return Err(Error::Validation {
			message: "tagging.top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.recommend.k == 0 {
		return Err(Error::Validation {
			message: "recommend.k must be greater than zero.".to_string(),
		});
	}
	if !cfg.recommend.popularity_boost.is_finite() {
		return Err(Error::Validation {
			message: "recommend.popularity_boost must be a finite number.".to_string(),
		});
	}
	if cfg.recommend.popularity_boost < 0.0 {
		return Err(Error::Validation {
			message: "recommend.popularity_boost must be zero or greater.".to_string(),
		});
	}
	if cfg.recommend.history_limit == 0 {
		return Err(Error::Validation {
			message: "recommend.history_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.eval.ks.is_empty() {
		return Err(Error::Validation { message: "eval.ks must be non-empty.".to_string() });
	}
	if cfg.eval.ks.contains(&0) {
		return Err(Error::Validation {
			message: "eval.ks values must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.tagging
		.labels_path
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.tagging.labels_path = None;
	}

	cfg.retrieval.mode = cfg.retrieval.mode.trim().to_ascii_lowercase();

	cfg.eval.ks.sort_unstable();
	cfg.eval.ks.dedup();
}
