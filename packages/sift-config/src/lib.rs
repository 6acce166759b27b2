mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, EmbeddingProviderConfig, Evidence, Fusion, FusionModeKind, LlmProviderConfig,
	Postgres, ProviderConfig, Providers, Rerank, Retrieval, Selection, Service, Sparse, Storage,
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

/// Same as [`load`] for a document that does not live on disk.
pub fn from_toml_str(raw: &str) -> Result<Config> {
	let mut cfg: Config =
		toml::from_str(raw).map_err(|err| Error::ParseDocument { source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	match (&cfg.storage.postgres, &cfg.storage.chunks_path) {
		(None, None) => {
			return Err(Error::Validation {
				message: "storage must configure either postgres or chunks_path.".to_string(),
			});
		},
		(Some(_), Some(_)) => {
			return Err(Error::Validation {
				message: "storage must configure only one of postgres or chunks_path.".to_string(),
			});
		},
		_ => {},
	}

	if let Some(postgres) = cfg.storage.postgres.as_ref() {
		if postgres.dsn.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.postgres.dsn must be non-empty.".to_string(),
			});
		}
		if postgres.pool_max_conns == 0 {
			return Err(Error::Validation {
				message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if let Some(cross_encoder) = cfg.providers.cross_encoder.as_ref()
		&& cross_encoder.api_base.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "providers.cross_encoder.api_base must be non-empty.".to_string(),
		});
	}
	if let Some(completion) = cfg.providers.completion.as_ref()
		&& completion.api_base.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "providers.completion.api_base must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("cache.embedding_capacity", cfg.cache.embedding_capacity),
		("retrieval.dense_top_n", cfg.retrieval.dense_top_n),
		("retrieval.sparse_top_n", cfg.retrieval.sparse_top_n),
		("rerank.top_n", cfg.rerank.top_n),
		("evidence.max_spans", cfg.evidence.max_spans),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !cfg.retrieval.unit_norm_tolerance.is_finite() || cfg.retrieval.unit_norm_tolerance < 0.0 {
		return Err(Error::Validation {
			message: "retrieval.unit_norm_tolerance must be a finite number of zero or greater."
				.to_string(),
		});
	}
	if !cfg.fusion.rrf_k.is_finite() || cfg.fusion.rrf_k < 0.0 {
		return Err(Error::Validation {
			message: "fusion.rrf_k must be a finite number of zero or greater.".to_string(),
		});
	}
	if !cfg.sparse.k1.is_finite() || cfg.sparse.k1 < 0.0 {
		return Err(Error::Validation {
			message: "sparse.k1 must be a finite number of zero or greater.".to_string(),
		});
	}

	for (label, value) in [
		("sparse.b", cfg.sparse.b),
		("fusion.dense_weight", cfg.fusion.dense_weight),
		("fusion.sparse_weight", cfg.fusion.sparse_weight),
		("evidence.min_score", cfg.evidence.min_score),
		("rerank.skip_score", cfg.rerank.skip_score),
		("rerank.original_weight_cross_encoder", cfg.rerank.original_weight_cross_encoder),
		("rerank.original_weight_llm", cfg.rerank.original_weight_llm),
		("rerank.rank_step", cfg.rerank.rank_step),
		("rerank.rank_floor", cfg.rerank.rank_floor),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !cfg.evidence.demotion_factor.is_finite()
		|| cfg.evidence.demotion_factor <= 0.0
		|| cfg.evidence.demotion_factor > 1.0
	{
		return Err(Error::Validation {
			message: "evidence.demotion_factor must be greater than 0.0 and at most 1.0."
				.to_string(),
		});
	}

	for (label, value) in [
		("sparse.epsilon", cfg.sparse.epsilon),
		("sparse.substring_bonus", cfg.sparse.substring_bonus),
		("evidence.substring_bonus", cfg.evidence.substring_bonus),
		("evidence.keyword_bonus", cfg.evidence.keyword_bonus),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number of zero or greater."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.chunks_path.as_deref().map(|path| path.as_os_str().is_empty()).unwrap_or(false) {
		cfg.storage.chunks_path = None;
	}

	let keywords = std::mem::take(&mut cfg.evidence.keywords);

	for keyword in keywords {
		let normalized = keyword.trim().to_lowercase();

		if normalized.is_empty() || cfg.evidence.keywords.contains(&normalized) {
			continue;
		}

		cfg.evidence.keywords.push(normalized);
	}
}
