use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub sparse: Sparse,
	#[serde(default)]
	pub fusion: Fusion,
	#[serde(default)]
	pub evidence: Evidence,
	#[serde(default)]
	pub rerank: Rerank,
	#[serde(default)]
	pub selection: Selection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: default_log_level() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Storage {
	pub postgres: Option<Postgres>,
	/// JSON file holding `{ "chunks": [...] }` for the file-backed store.
	pub chunks_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub cross_encoder: Option<ProviderConfig>,
	pub completion: Option<LlmProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub embedding_capacity: u32,
}
impl Default for Cache {
	fn default() -> Self {
		Self { embedding_capacity: 100 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub dense_top_n: u32,
	pub sparse_top_n: u32,
	/// Vectors whose norm is within this distance of 1.0 are compared with a plain dot product.
	pub unit_norm_tolerance: f32,
	pub embed_timeout_ms: u64,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			dense_top_n: 12,
			sparse_top_n: 12,
			unit_norm_tolerance: 0.01,
			embed_timeout_ms: 10_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Sparse {
	pub bm25_enabled: bool,
	pub k1: f32,
	pub b: f32,
	/// Floor applied to negative IDF values, as a fraction of the mean IDF.
	pub epsilon: f32,
	pub substring_bonus: f32,
}
impl Default for Sparse {
	fn default() -> Self {
		Self { bm25_enabled: true, k1: 1.5, b: 0.75, epsilon: 0.25, substring_bonus: 0.5 }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionModeKind {
	#[default]
	Rrf,
	/// Deprecated. Kept for comparisons against older rankings.
	WeightedAverage,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Fusion {
	pub mode: FusionModeKind,
	pub rrf_k: f32,
	pub dense_weight: f32,
	pub sparse_weight: f32,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { mode: FusionModeKind::Rrf, rrf_k: 60.0, dense_weight: 0.6, sparse_weight: 0.4 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Evidence {
	pub enabled: bool,
	pub min_score: f32,
	pub demotion_factor: f32,
	pub keep_top_n: u32,
	pub max_spans: u32,
	pub substring_bonus: f32,
	pub keyword_bonus: f32,
	pub keywords: Vec<String>,
}
impl Default for Evidence {
	fn default() -> Self {
		Self {
			enabled: true,
			min_score: 0.15,
			demotion_factor: 0.5,
			keep_top_n: 10,
			max_spans: 3,
			substring_bonus: 0.3,
			keyword_bonus: 0.1,
			keywords: Vec::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub top_n: u32,
	/// Reranking is skipped below this many candidates.
	pub min_candidates: u32,
	/// Reranking is skipped when the leading fused score reaches this value.
	pub skip_score: f32,
	pub timeout_ms: u64,
	pub original_weight_cross_encoder: f32,
	pub original_weight_llm: f32,
	pub rank_step: f32,
	pub rank_floor: f32,
	pub preview_chars: u32,
}
impl Default for Rerank {
	fn default() -> Self {
		Self {
			top_n: 12,
			min_candidates: 4,
			skip_score: 0.85,
			timeout_ms: 15_000,
			original_weight_cross_encoder: 0.3,
			original_weight_llm: 0.4,
			rank_step: 0.1,
			rank_floor: 0.1,
			preview_chars: 300,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selection {
	pub multi_doc_per_doc_limit: u32,
}
impl Default for Selection {
	fn default() -> Self {
		Self { multi_doc_per_doc_limit: 2 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
