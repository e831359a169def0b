use std::{
	collections::{BTreeMap, HashMap, HashSet},
	fs,
	hash::Hash,
	path::Path,
	sync::{Arc, Mutex, RwLock},
};

use serde::Serialize;

use crate::{Error, Result};
use mis_config::Tagging;
use mis_domain::{
	ScoredLabel,
	vector::{cmp_f32_desc, cosine_similarity, l2_normalize},
};
use mis_providers::EmbeddingProvider;

const DEFAULT_TOP_N: usize = 1;
const DEFAULT_THRESHOLD: f32 = 0.35;

/// Immutable label list and its centroids. Swapped as a whole on every update.
#[derive(Debug)]
struct LabelSet {
	labels: Vec<String>,
	centroids: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaggingMetrics {
	pub precision: f64,
	pub recall: f64,
	pub f1: f64,
}

/// Nearest-centroid tagger over named label groups.
pub struct LabelTagger {
	embedding: Arc<dyn EmbeddingProvider>,
	groups: RwLock<BTreeMap<String, Arc<LabelSet>>>,
	writers: Mutex<HashMap<String, Arc<Mutex<()>>>>,
	top_n: usize,
	threshold: f32,
}
impl LabelTagger {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self {
			embedding,
			groups: RwLock::new(BTreeMap::new()),
			writers: Mutex::new(HashMap::new()),
			top_n: DEFAULT_TOP_N,
			threshold: DEFAULT_THRESHOLD,
		}
	}

	/// Builds a tagger with the configured `top_n` and `threshold` defaults and loads
	/// `labels_path` when one is configured.
	pub fn from_config(embedding: Arc<dyn EmbeddingProvider>, cfg: &Tagging) -> Result<Self> {
		let mut tagger = Self::new(embedding);

		tagger.top_n = cfg.top_n as usize;
		tagger.threshold = cfg.threshold;

		if let Some(path) = cfg.labels_path.as_ref() {
			tagger.load_labels(path)?;
		}

		Ok(tagger)
	}

	/// Replaces the labels of `group` and their centroids in one step.
	pub fn set_labels(&self, group: &str, labels: Vec<String>) -> Result<()> {
		let writer = self.writer(group);
		let _guard = writer.lock().unwrap_or_else(|err| err.into_inner());
		let centroids = if labels.is_empty() {
			Vec::new()
		} else {
			self.embedding.embed(&labels)?.iter().map(|vector| l2_normalize(vector)).collect()
		};

		if centroids.len() != labels.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} labels.",
					centroids.len(),
					labels.len()
				),
			});
		}

		let count = labels.len();
		let snapshot = Arc::new(LabelSet { labels, centroids });

		self.groups
			.write()
			.unwrap_or_else(|err| err.into_inner())
			.insert(group.to_string(), snapshot);

		tracing::debug!(group, labels = count, "Updated label group.");

		Ok(())
	}

	/// Reads a JSON object of `group -> [label, ...]` and sets every group. Returns the number of
	/// groups loaded.
	pub fn load_labels(&self, path: &Path) -> Result<usize> {
		let raw = fs::read_to_string(path)
			.map_err(|source| Error::ReadLabels { path: path.to_path_buf(), source })?;
		let groups: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
			.map_err(|source| Error::ParseLabels { path: path.to_path_buf(), source })?;
		let count = groups.len();

		for (group, labels) in groups {
			self.set_labels(&group, labels)?;
		}

		tracing::info!(path = %path.display(), groups = count, "Loaded label groups.");

		Ok(count)
	}

	pub fn groups(&self) -> Vec<String> {
		self.groups.read().unwrap_or_else(|err| err.into_inner()).keys().cloned().collect()
	}

	pub fn labels(&self, group: &str) -> Option<Vec<String>> {
		self.snapshot(group).map(|set| set.labels.clone())
	}

	/// Labels of `group` whose centroid similarity to `text` is at least `threshold`, best first,
	/// at most `top_n`. An unknown group yields no labels.
	pub fn assign(
		&self,
		text: &str,
		group: &str,
		top_n: usize,
		threshold: f32,
	) -> Result<Vec<ScoredLabel>> {
		let Some(set) = self.snapshot(group) else {
			return Ok(Vec::new());
		};

		if set.labels.is_empty() || top_n == 0 {
			return Ok(Vec::new());
		}

		let query = self.embedding.embed_one(text)?;

		rank_labels(&set, &query, top_n, threshold)
	}

	/// [`LabelTagger::assign`] with the tagger's `top_n` and `threshold` defaults.
	pub fn assign_with_defaults(&self, text: &str, group: &str) -> Result<Vec<ScoredLabel>> {
		self.assign(text, group, self.top_n, self.threshold)
	}

	/// [`LabelTagger::assign_all_groups`] with the tagger's `top_n` and `threshold` defaults.
	pub fn assign_all_groups_with_defaults(
		&self,
		text: &str,
	) -> Result<BTreeMap<String, Vec<ScoredLabel>>> {
		self.assign_all_groups(text, self.top_n, self.threshold)
	}

	/// Runs [`LabelTagger::assign`] for every group, embedding `text` once.
	pub fn assign_all_groups(
		&self,
		text: &str,
		top_n: usize,
		threshold: f32,
	) -> Result<BTreeMap<String, Vec<ScoredLabel>>> {
		let snapshot: Vec<(String, Arc<LabelSet>)> = self
			.groups
			.read()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.map(|(group, set)| (group.clone(), set.clone()))
			.collect();

		if snapshot.is_empty() {
			return Ok(BTreeMap::new());
		}

		let query = self.embedding.embed_one(text)?;
		let mut out = BTreeMap::new();

		for (group, set) in snapshot {
			let labels = if top_n == 0 {
				Vec::new()
			} else {
				rank_labels(&set, &query, top_n, threshold)?
			};

			out.insert(group, labels);
		}

		Ok(out)
	}

	fn snapshot(&self, group: &str) -> Option<Arc<LabelSet>> {
		self.groups.read().unwrap_or_else(|err| err.into_inner()).get(group).cloned()
	}

	fn writer(&self, group: &str) -> Arc<Mutex<()>> {
		self.writers
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.entry(group.to_string())
			.or_default()
			.clone()
	}
}

/// Macro-averaged precision, recall and F1 over per-item label sets.
///
/// An item with no predicted and no true labels scores 1.0 on all three.
pub fn evaluate_tagging<L>(predictions: &[Vec<L>], truth: &[Vec<L>]) -> Result<TaggingMetrics>
where
	L: Eq + Hash,
{
	if predictions.len() != truth.len() {
		return Err(Error::invalid(format!(
			"Got {} predictions and {} ground-truth entries.",
			predictions.len(),
			truth.len()
		)));
	}
	if predictions.is_empty() {
		return Ok(TaggingMetrics { precision: 0.0, recall: 0.0, f1: 0.0 });
	}

	let mut precision_sum = 0.0_f64;
	let mut recall_sum = 0.0_f64;
	let mut f1_sum = 0.0_f64;

	for (predicted, expected) in predictions.iter().zip(truth) {
		let predicted: HashSet<&L> = predicted.iter().collect();
		let expected: HashSet<&L> = expected.iter().collect();

		if predicted.is_empty() && expected.is_empty() {
			precision_sum += 1.0;
			recall_sum += 1.0;
			f1_sum += 1.0;

			continue;
		}

		let tp = predicted.intersection(&expected).count() as f64;
		let precision = if predicted.is_empty() { 0.0 } else { tp / predicted.len() as f64 };
		let recall = if expected.is_empty() { 0.0 } else { tp / expected.len() as f64 };

		precision_sum += precision;
		recall_sum += recall;

		if precision + recall > 0.0 {
			f1_sum += 2.0 * precision * recall / (precision + recall);
		}
	}

	let n = predictions.len() as f64;

	Ok(TaggingMetrics { precision: precision_sum / n, recall: recall_sum / n, f1: f1_sum / n })
}

fn rank_labels(
	set: &LabelSet,
	query: &[f32],
	top_n: usize,
	threshold: f32,
) -> Result<Vec<ScoredLabel>> {
	if let Some(centroid) = set.centroids.first()
		&& centroid.len() != query.len()
	{
		return Err(Error::Provider {
			message: format!(
				"Query embedding has {} dimensions but label centroids have {}.",
				query.len(),
				centroid.len()
			),
		});
	}

	let mut scored: Vec<ScoredLabel> = set
		.labels
		.iter()
		.zip(&set.centroids)
		.map(|(label, centroid)| ScoredLabel {
			label: label.clone(),
			score: cosine_similarity(query, centroid),
		})
		.filter(|scored| scored.score >= threshold)
		.collect();

	scored.sort_by(|left, right| cmp_f32_desc(left.score, right.score));
	scored.truncate(top_n);

	Ok(scored)
}
