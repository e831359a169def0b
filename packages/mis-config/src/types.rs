use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub dedup: Dedup,
	pub tagging: Tagging,
	pub recommend: Recommend,
	pub eval: Eval,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// May be empty for local servers that do not check credentials.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Retrieval {
	/// One of `sparse`, `dense` or `hybrid`.
	pub mode: String,
	/// Sparse weight. Dense receives `1 - alpha`.
	pub alpha: f32,
	pub top_k: u32,
	pub sparse_k: u32,
	pub dense_k: u32,
	/// Forwarded to the vector index as a search-quality hint (e.g. HNSW `ef_search`).
	pub search_quality: Option<u32>,
	#[serde(default = "default_true")]
	pub strip_diacritics: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Dedup {
	pub sim_threshold: f32,
	/// Compare items only within the same blocking key (e.g. city).
	pub use_blocking: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tagging {
	pub top_n: u32,
	pub threshold: f32,
	pub labels_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Recommend {
	pub k: u32,
	pub popularity_boost: f32,
	/// Most recent interactions considered when rebuilding a profile.
	pub history_limit: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Eval {
	pub ks: Vec<u32>,
}

fn default_true() -> bool {
	true
}
