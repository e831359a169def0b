use std::{fmt, hash::Hash, str::FromStr, sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, fusion};
use mis_config::Retrieval;
use mis_domain::{ScoredCandidate, normalize};
use mis_providers::{EmbeddingProvider, KeywordScorer, VectorIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
	Sparse,
	Dense,
	Hybrid,
}
impl RetrievalMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sparse => "sparse",
			Self::Dense => "dense",
			Self::Hybrid => "hybrid",
		}
	}
}
impl FromStr for RetrievalMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"sparse" => Ok(Self::Sparse),
			"dense" => Ok(Self::Dense),
			"hybrid" => Ok(Self::Hybrid),
			other => Err(Error::invalid(format!(
				"Unknown retrieval mode {other:?}; expected sparse, dense, or hybrid."
			))),
		}
	}
}
impl fmt::Display for RetrievalMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
	Sparse,
	Dense,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
	pub mode: RetrievalMode,
	pub k: usize,
	pub alpha: f32,
	/// Keyword candidates gathered before fusion.
	pub sparse_k: usize,
	/// Vector candidates gathered before fusion.
	pub dense_k: usize,
	pub search_quality: Option<u32>,
	/// Only keyword search observes `false`: `HttpEmbedder` re-normalizes its input with
	/// diacritics stripped.
	pub strip_diacritics: bool,
}
impl SearchRequest {
	pub fn from_config(cfg: &Retrieval) -> Result<Self> {
		Ok(Self {
			mode: cfg.mode.parse()?,
			k: cfg.top_k as usize,
			alpha: cfg.alpha,
			sparse_k: cfg.sparse_k as usize,
			dense_k: cfg.dense_k as usize,
			search_quality: cfg.search_quality,
			strip_diacritics: cfg.strip_diacritics,
		})
	}

	fn validate(&self) -> Result<()> {
		if self.k == 0 {
			return Err(Error::invalid("k must be greater than zero."));
		}
		if self.mode == RetrievalMode::Hybrid {
			fusion::validate_alpha(self.alpha)?;

			if self.sparse_k == 0 || self.dense_k == 0 {
				return Err(Error::invalid("sparse_k and dense_k must be greater than zero."));
			}
		}

		Ok(())
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchTimings {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sparse_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub embed_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dense_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fusion_ms: Option<f64>,
	pub total_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse<Id> {
	pub query: String,
	pub normalized_query: String,
	pub mode: RetrievalMode,
	pub items: Vec<ScoredCandidate<Id>>,
	/// Sources that failed and were skipped in hybrid mode.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub failed_sources: Vec<RetrievalSource>,
	pub timings: SearchTimings,
}

pub struct Providers<Id> {
	pub keyword: Arc<dyn KeywordScorer<Id>>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub index: Arc<dyn VectorIndex<Id>>,
}
impl<Id> Providers<Id> {
	pub fn new(
		keyword: Arc<dyn KeywordScorer<Id>>,
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn VectorIndex<Id>>,
	) -> Self {
		Self { keyword, embedding, index }
	}
}

/// Query-time composition of keyword retrieval, vector retrieval and score fusion.
pub struct HybridSearcher<Id> {
	providers: Providers<Id>,
}
impl<Id> HybridSearcher<Id>
where
	Id: Clone + Eq + Hash + Ord,
{
	pub fn new(providers: Providers<Id>) -> Self {
		Self { providers }
	}

	pub fn search(&self, query: &str, req: &SearchRequest) -> Result<SearchResponse<Id>> {
		req.validate()?;

		let started = Instant::now();
		let normalized_query = normalize::normalize(query, req.strip_diacritics);

		if normalized_query.is_empty() {
			return Err(Error::invalid("query must be non-empty."));
		}

		let mut timings = SearchTimings::default();
		let mut failed_sources = Vec::new();
		let items = match req.mode {
			RetrievalMode::Sparse => {
				let mut items = self.sparse(&normalized_query, req.k, &mut timings)?;

				items.truncate(req.k);

				items
			},
			RetrievalMode::Dense => {
				let mut items = self.dense(&normalized_query, req.k, req, &mut timings)?;

				items.truncate(req.k);

				items
			},
			RetrievalMode::Hybrid => {
				let sparse = self.sparse(&normalized_query, req.sparse_k, &mut timings);
				let dense = self.dense(&normalized_query, req.dense_k, req, &mut timings);
				let (sparse, dense) = match (sparse, dense) {
					(Ok(sparse), Ok(dense)) => (sparse, dense),
					(Err(err), Ok(dense)) => {
						tracing::warn!(
							error = %err,
							"Sparse retrieval failed. Continuing dense-only."
						);
						failed_sources.push(RetrievalSource::Sparse);

						(Vec::new(), dense)
					},
					(Ok(sparse), Err(err)) => {
						tracing::warn!(
							error = %err,
							"Dense retrieval failed. Continuing sparse-only."
						);
						failed_sources.push(RetrievalSource::Dense);

						(sparse, Vec::new())
					},
					(Err(sparse_err), Err(dense_err)) => {
						tracing::warn!(error = %sparse_err, "Sparse retrieval failed.");

						return Err(dense_err);
					},
				};
				let fusion_started = Instant::now();
				let mut items = fusion::combine(&sparse, &dense, req.alpha)?;

				items.truncate(req.k);

				timings.fusion_ms = Some(elapsed_ms(fusion_started));

				items
			},
		};

		timings.total_ms = elapsed_ms(started);

		tracing::debug!(
			mode = %req.mode,
			results = items.len(),
			total_ms = timings.total_ms,
			"Search completed."
		);

		Ok(SearchResponse {
			query: query.to_string(),
			normalized_query,
			mode: req.mode,
			items,
			failed_sources,
			timings,
		})
	}

	fn sparse(
		&self,
		query: &str,
		k: usize,
		timings: &mut SearchTimings,
	) -> Result<Vec<ScoredCandidate<Id>>> {
		let started = Instant::now();
		let result = self.providers.keyword.search(query, k);

		timings.sparse_ms = Some(elapsed_ms(started));

		Ok(result?)
	}

	fn dense(
		&self,
		query: &str,
		k: usize,
		req: &SearchRequest,
		timings: &mut SearchTimings,
	) -> Result<Vec<ScoredCandidate<Id>>> {
		let started = Instant::now();
		let vector = self.providers.embedding.embed_one(query);

		timings.embed_ms = Some(elapsed_ms(started));

		let vector = vector?;
		let started = Instant::now();
		let result = self.providers.index.search(&vector, k, req.search_quality);

		timings.dense_ms = Some(elapsed_ms(started));

		Ok(result?)
	}
}

fn elapsed_ms(started: Instant) -> f64 {
	started.elapsed().as_secs_f64() * 1_000.0
}
