use std::{
	collections::{BTreeMap, HashMap, HashSet},
	hash::Hash,
};

use rayon::prelude::*;
use serde::Serialize;

use crate::{Error, Result};
use mis_config::Dedup;
use mis_domain::vector::cosine_similarity;

/// Union-find over arbitrary identifiers with path compression and union by rank.
///
/// `find` and `union` insert unseen identifiers as singletons.
#[derive(Clone, Debug)]
pub struct DisjointSet<Id> {
	index: HashMap<Id, usize>,
	items: Vec<Id>,
	parent: Vec<usize>,
	rank: Vec<u8>,
}
impl<Id> DisjointSet<Id>
where
	Id: Clone + Eq + Hash + Ord,
{
	pub fn new() -> Self {
		Self { index: HashMap::new(), items: Vec::new(), parent: Vec::new(), rank: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn insert(&mut self, id: Id) -> usize {
		if let Some(idx) = self.index.get(&id) {
			return *idx;
		}

		let idx = self.items.len();

		self.index.insert(id.clone(), idx);
		self.items.push(id);
		self.parent.push(idx);
		self.rank.push(0);

		idx
	}

	/// Returns the root identifier of the set containing `id`.
	pub fn find(&mut self, id: Id) -> Id {
		let idx = self.insert(id);
		let root = self.find_index(idx);

		self.items[root].clone()
	}

	/// Merges the sets of `a` and `b`. Returns `false` when they were already joined.
	pub fn union(&mut self, a: Id, b: Id) -> bool {
		let a = self.insert(a);
		let b = self.insert(b);

		self.union_indices(a, b)
	}

	/// Every set keyed by its root, members in insertion order. Singletons included.
	pub fn clusters(&mut self) -> BTreeMap<Id, Vec<Id>> {
		let mut out: BTreeMap<Id, Vec<Id>> = BTreeMap::new();

		for idx in 0..self.items.len() {
			let root = self.find_index(idx);

			out.entry(self.items[root].clone()).or_default().push(self.items[idx].clone());
		}

		out
	}

	fn find_index(&mut self, idx: usize) -> usize {
		let mut root = idx;

		while self.parent[root] != root {
			root = self.parent[root];
		}

		let mut cur = idx;

		while self.parent[cur] != root {
			let next = self.parent[cur];

			self.parent[cur] = root;
			cur = next;
		}

		root
	}

	fn union_indices(&mut self, a: usize, b: usize) -> bool {
		let root_a = self.find_index(a);
		let root_b = self.find_index(b);

		if root_a == root_b {
			return false;
		}

		match self.rank[root_a].cmp(&self.rank[root_b]) {
			std::cmp::Ordering::Less => self.parent[root_a] = root_b,
			std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
			std::cmp::Ordering::Equal => {
				self.parent[root_b] = root_a;
				self.rank[root_a] += 1;
			},
		}

		true
	}
}
impl<Id> Default for DisjointSet<Id>
where
	Id: Clone + Eq + Hash + Ord,
{
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
	pub total_items: usize,
	pub num_clusters: usize,
	pub num_duplicates: usize,
	pub pairs_compared: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairMetrics {
	pub precision: f64,
	pub recall: f64,
	pub f1: f64,
	pub true_positives: usize,
	pub false_positives: usize,
	pub false_negatives: usize,
}

/// Groups near-duplicate items. See [`cluster_with_report`].
pub fn cluster<Id, K>(
	item_ids: &[Id],
	embeddings: &[Vec<f32>],
	threshold: f32,
	block_keys: Option<&[K]>,
) -> Result<BTreeMap<Id, Vec<Id>>>
where
	Id: Clone + Eq + Hash + Ord,
	K: Eq + Hash,
{
	cluster_with_report(item_ids, embeddings, threshold, block_keys).map(|(clusters, _)| clusters)
}

/// Unions every pair whose cosine similarity is at least `threshold` and returns the clusters
/// with two or more members, keyed by their root id.
///
/// With `block_keys`, only items sharing a key are compared; duplicates split across keys are
/// never found. Each block costs O(n^2) comparisons, so large catalogs need blocking.
pub fn cluster_with_report<Id, K>(
	item_ids: &[Id],
	embeddings: &[Vec<f32>],
	threshold: f32,
	block_keys: Option<&[K]>,
) -> Result<(BTreeMap<Id, Vec<Id>>, DedupReport)>
where
	Id: Clone + Eq + Hash + Ord,
	K: Eq + Hash,
{
	validate_inputs(item_ids, embeddings, threshold, block_keys)?;

	let blocks = partition(item_ids.len(), block_keys);
	let per_block: Vec<(Vec<(usize, usize)>, u64)> =
		blocks.par_iter().map(|block| block_edges(block, embeddings, threshold)).collect();
	let mut set = DisjointSet::new();

	for id in item_ids {
		set.insert(id.clone());
	}

	let mut pairs_compared = 0_u64;

	// Blocks are disjoint, so applying unions in block order matches the sequential result.
	for (edges, compared) in per_block {
		pairs_compared += compared;

		for (i, j) in edges {
			set.union(item_ids[i].clone(), item_ids[j].clone());
		}
	}

	let clusters: BTreeMap<Id, Vec<Id>> =
		set.clusters().into_iter().filter(|(_, members)| members.len() > 1).collect();
	let report = DedupReport {
		total_items: item_ids.len(),
		num_clusters: clusters.len(),
		num_duplicates: clusters.values().map(Vec::len).sum(),
		pairs_compared,
	};

	tracing::debug!(
		items = report.total_items,
		blocks = blocks.len(),
		clusters = report.num_clusters,
		pairs_compared,
		"Clustered near-duplicate items."
	);

	Ok((clusters, report))
}

/// Runs [`cluster_with_report`] with `dedup.sim_threshold`. Block keys are ignored unless
/// `dedup.use_blocking` is set.
pub fn cluster_with_config<Id, K>(
	item_ids: &[Id],
	embeddings: &[Vec<f32>],
	block_keys: Option<&[K]>,
	cfg: &Dedup,
) -> Result<(BTreeMap<Id, Vec<Id>>, DedupReport)>
where
	Id: Clone + Eq + Hash + Ord,
	K: Eq + Hash,
{
	let block_keys = if cfg.use_blocking { block_keys } else { None };

	cluster_with_report(item_ids, embeddings, cfg.sim_threshold, block_keys)
}

/// Expands clusters into unordered duplicate pairs, each pair once.
pub fn compute_dedup_pairs<Id>(clusters: &BTreeMap<Id, Vec<Id>>) -> Vec<(Id, Id)>
where
	Id: Clone,
{
	let mut pairs = Vec::new();

	for members in clusters.values() {
		for (i, left) in members.iter().enumerate() {
			for right in &members[i + 1..] {
				pairs.push((left.clone(), right.clone()));
			}
		}
	}

	pairs
}

/// Scores predicted duplicate pairs against ground truth; `(a, b)` and `(b, a)` are the same pair.
pub fn evaluate_dedup_pairs<Id>(predicted: &[(Id, Id)], truth: &[(Id, Id)]) -> PairMetrics
where
	Id: Clone + Eq + Hash + Ord,
{
	let predicted: HashSet<(Id, Id)> = predicted.iter().map(canonical_pair).collect();
	let truth: HashSet<(Id, Id)> = truth.iter().map(canonical_pair).collect();
	let tp = predicted.intersection(&truth).count();
	let fp = predicted.len() - tp;
	let fn_ = truth.len() - tp;
	let precision = ratio(tp, tp + fp);
	let recall = ratio(tp, tp + fn_);
	let f1 = if precision + recall > 0.0 {
		2.0 * precision * recall / (precision + recall)
	} else {
		0.0
	};

	PairMetrics {
		precision,
		recall,
		f1,
		true_positives: tp,
		false_positives: fp,
		false_negatives: fn_,
	}
}

fn validate_inputs<Id, K>(
	item_ids: &[Id],
	embeddings: &[Vec<f32>],
	threshold: f32,
	block_keys: Option<&[K]>,
) -> Result<()> {
	if item_ids.len() != embeddings.len() {
		return Err(Error::invalid(format!(
			"Got {} item ids and {} embeddings.",
			item_ids.len(),
			embeddings.len()
		)));
	}
	if let Some(keys) = block_keys
		&& keys.len() != item_ids.len()
	{
		return Err(Error::invalid(format!(
			"Got {} item ids and {} block keys.",
			item_ids.len(),
			keys.len()
		)));
	}
	if let Some(first) = embeddings.first()
		&& let Some(bad) = embeddings.iter().find(|vector| vector.len() != first.len())
	{
		return Err(Error::invalid(format!(
			"Embedding dimensions differ: expected {}, got {}.",
			first.len(),
			bad.len()
		)));
	}
	if !threshold.is_finite() {
		return Err(Error::invalid("threshold must be a finite number."));
	}

	Ok(())
}

/// Item positions grouped by block key, blocks ordered by first appearance.
fn partition<K>(len: usize, block_keys: Option<&[K]>) -> Vec<Vec<usize>>
where
	K: Eq + Hash,
{
	let Some(keys) = block_keys else {
		return if len == 0 { Vec::new() } else { vec![(0..len).collect()] };
	};
	let mut slots: HashMap<&K, usize> = HashMap::new();
	let mut blocks: Vec<Vec<usize>> = Vec::new();

	for (idx, key) in keys.iter().enumerate() {
		let slot = *slots.entry(key).or_insert_with(|| {
			blocks.push(Vec::new());

			blocks.len() - 1
		});

		blocks[slot].push(idx);
	}

	blocks
}

fn block_edges(
	block: &[usize],
	embeddings: &[Vec<f32>],
	threshold: f32,
) -> (Vec<(usize, usize)>, u64) {
	let mut edges = Vec::new();
	let mut compared = 0_u64;

	for (pos, &i) in block.iter().enumerate() {
		for &j in &block[pos + 1..] {
			compared += 1;

			if cosine_similarity(&embeddings[i], &embeddings[j]) >= threshold {
				edges.push((i, j));
			}
		}
	}

	(edges, compared)
}

fn canonical_pair<Id>(pair: &(Id, Id)) -> (Id, Id)
where
	Id: Clone + Ord,
{
	let (a, b) = pair;

	if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) }
}

fn ratio(num: usize, den: usize) -> f64 {
	if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
