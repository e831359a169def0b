pub mod bm25;
pub mod embedding;
pub mod error;
pub mod flat;

pub use bm25::Bm25Scorer;
pub use embedding::HttpEmbedder;
pub use error::{Error, Result};
pub use flat::FlatIndex;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use mis_domain::ScoredCandidate;

/// Maps text to fixed-length vectors. Must be deterministic for identical input.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

	fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed(&[text.to_string()])?;

		if vectors.len() != 1 {
			return Err(Error::InvalidResponse {
				message: format!("Expected one embedding, got {}.", vectors.len()),
			});
		}

		Ok(vectors.remove(0))
	}
}

/// Sparse keyword retrieval over tokenized documents.
pub trait KeywordScorer<Id>
where
	Self: Send + Sync,
{
	fn fit(&mut self, documents: &[String], ids: &[Id]) -> Result<()>;

	/// Returns at most `k` candidates sorted by descending score.
	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate<Id>>>;
}

/// Nearest-neighbor store returning `(id, similarity)` pairs.
pub trait VectorIndex<Id>
where
	Self: Send + Sync,
{
	fn add(&mut self, ids: &[Id], vectors: &[Vec<f32>], metadata: Option<&[Value]>) -> Result<()>;

	/// Returns at most `k` candidates sorted by descending similarity. `search_quality` is an
	/// engine-specific effort hint (e.g. HNSW `ef_search`) that engines may ignore.
	fn search(
		&self,
		query: &[f32],
		k: usize,
		search_quality: Option<u32>,
	) -> Result<Vec<ScoredCandidate<Id>>>;

	/// Returns the number of removed entries.
	fn delete(&mut self, ids: &[Id]) -> Result<usize>;

	fn count(&self) -> usize;
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if !api_key.trim().is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
