//! Deterministic provider doubles and fixture helpers shared by the integration tests.

use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	process,
	sync::{
		Arc,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};

use serde_json::Value;

use mis_domain::{ScoredCandidate, normalize, vector};
use mis_providers::{EmbeddingProvider, Error, KeywordScorer, Result, VectorIndex};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Bag-of-words embedder that hashes normalized tokens into fixed buckets.
///
/// Texts with the same token multiset embed to the same unit vector.
pub struct HashEmbedder {
	pub dimensions: usize,
}
impl HashEmbedder {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions }
	}

	fn bucket(&self, token: &str) -> usize {
		let hash = blake3::hash(token.as_bytes());
		let mut buf = [0_u8; 8];

		buf.copy_from_slice(&hash.as_bytes()[..8]);

		(u64::from_le_bytes(buf) % self.dimensions as u64) as usize
	}
}
impl EmbeddingProvider for HashEmbedder {
	fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		Ok(texts
			.iter()
			.map(|text| {
				let mut counts = vec![0.0_f32; self.dimensions];

				for token in normalize::normalize(text, true).split_whitespace() {
					counts[self.bucket(token)] += 1.0;
				}

				vector::l2_normalize(&counts)
			})
			.collect())
	}
}

/// Returns hand-picked vectors keyed by exact text.
pub struct TableEmbedder {
	vectors: HashMap<String, Vec<f32>>,
}
impl TableEmbedder {
	pub fn new<I, S>(entries: I) -> Self
	where
		I: IntoIterator<Item = (S, Vec<f32>)>,
		S: Into<String>,
	{
		Self { vectors: entries.into_iter().map(|(text, vector)| (text.into(), vector)).collect() }
	}
}
impl EmbeddingProvider for TableEmbedder {
	fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		texts
			.iter()
			.map(|text| {
				self.vectors.get(text).cloned().ok_or_else(|| Error::InvalidInput {
					message: format!("No test vector for {text:?}."),
				})
			})
			.collect()
	}
}

/// Counts `embed` calls before delegating.
pub struct SpyEmbedder<E> {
	pub inner: E,
	pub calls: Arc<AtomicUsize>,
}
impl<E> SpyEmbedder<E> {
	pub fn new(inner: E) -> Self {
		Self { inner, calls: Arc::new(AtomicUsize::new(0)) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl<E> EmbeddingProvider for SpyEmbedder<E>
where
	E: EmbeddingProvider,
{
	fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		self.inner.embed(texts)
	}
}

pub struct FailingEmbedder;
impl EmbeddingProvider for FailingEmbedder {
	fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
		Err(unavailable("embedding"))
	}
}

/// Keyword scorer that ignores the query and replays a fixed ranking.
pub struct StaticScorer<Id> {
	pub results: Vec<ScoredCandidate<Id>>,
}
impl<Id> StaticScorer<Id> {
	pub fn new<I>(results: I) -> Self
	where
		I: IntoIterator<Item = (Id, f32)>,
	{
		Self { results: results.into_iter().map(ScoredCandidate::from).collect() }
	}
}
impl<Id> KeywordScorer<Id> for StaticScorer<Id>
where
	Id: Clone + Send + Sync,
{
	fn fit(&mut self, _documents: &[String], _ids: &[Id]) -> Result<()> {
		Ok(())
	}

	fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredCandidate<Id>>> {
		Ok(self.results.iter().take(k).cloned().collect())
	}
}

pub struct FailingScorer;
impl<Id> KeywordScorer<Id> for FailingScorer {
	fn fit(&mut self, _documents: &[String], _ids: &[Id]) -> Result<()> {
		Ok(())
	}

	fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredCandidate<Id>>> {
		Err(unavailable("keyword"))
	}
}

pub struct FailingIndex;
impl<Id> VectorIndex<Id> for FailingIndex {
	fn add(
		&mut self,
		_ids: &[Id],
		_vectors: &[Vec<f32>],
		_metadata: Option<&[Value]>,
	) -> Result<()> {
		Err(unavailable("vector"))
	}

	fn search(
		&self,
		_query: &[f32],
		_k: usize,
		_search_quality: Option<u32>,
	) -> Result<Vec<ScoredCandidate<Id>>> {
		Err(unavailable("vector"))
	}

	fn delete(&mut self, _ids: &[Id]) -> Result<usize> {
		Err(unavailable("vector"))
	}

	fn count(&self) -> usize {
		0
	}
}

/// Writes `contents` to a fresh file under the system temp directory.
pub fn write_temp_file(prefix: &str, extension: &str, contents: &str) -> PathBuf {
	let path = temp_path(prefix, extension);

	fs::write(&path, contents).unwrap_or_else(|err| panic!("Failed to write {path:?}: {err}."));

	path
}

pub fn temp_path(prefix: &str, extension: &str) -> PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
	let seq = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);

	env::temp_dir().join(format!("{prefix}_{}_{nanos}_{seq}.{extension}", process::id()))
}

fn unavailable(kind: &str) -> Error {
	Error::InvalidResponse { message: format!("The {kind} provider is unavailable.") }
}
