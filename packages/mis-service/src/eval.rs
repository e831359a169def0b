use std::{collections::HashSet, hash::Hash};

use serde::Serialize;

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CutoffMetrics {
	pub k: usize,
	pub recall: f64,
	pub precision: f64,
	pub ndcg: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchReport {
	pub query_count: usize,
	/// Queries with a non-empty relevant set; only these enter the averages.
	pub judged_count: usize,
	pub mrr: f64,
	pub cutoffs: Vec<CutoffMetrics>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryMetrics {
	pub query_id: String,
	pub num_relevant: usize,
	pub hit: bool,
	pub first_hit_rank: Option<usize>,
	pub recall: f64,
	pub precision: f64,
	pub rr: f64,
	pub ndcg: f64,
}

/// Mean share of each relevant set found in the top `k`.
pub fn recall_at_k<Id>(predictions: &[Vec<Id>], truth: &[Vec<Id>], k: usize) -> Result<f64>
where
	Id: Eq + Hash,
{
	average(predictions, truth, |predicted, relevant| {
		hits_at(predicted, relevant, k) as f64 / relevant.len() as f64
	})
}

/// Mean share of the top `k` slots holding relevant items. Divides by `k`, not by the number
/// retrieved.
pub fn precision_at_k<Id>(predictions: &[Vec<Id>], truth: &[Vec<Id>], k: usize) -> Result<f64>
where
	Id: Eq + Hash,
{
	average(predictions, truth, |predicted, relevant| precision(predicted, relevant, k))
}

pub fn mean_reciprocal_rank<Id>(predictions: &[Vec<Id>], truth: &[Vec<Id>]) -> Result<f64>
where
	Id: Eq + Hash,
{
	average(predictions, truth, |predicted, relevant| {
		first_hit_rank(predicted, relevant).map(|rank| 1.0 / rank as f64).unwrap_or(0.0)
	})
}

pub fn ndcg_at_k<Id>(predictions: &[Vec<Id>], truth: &[Vec<Id>], k: usize) -> Result<f64>
where
	Id: Eq + Hash,
{
	average(predictions, truth, |predicted, relevant| ndcg(predicted, relevant, k))
}

/// MRR plus recall, precision and NDCG at every cutoff in `ks`, in the given order.
pub fn evaluate_search<Id>(
	predictions: &[Vec<Id>],
	truth: &[Vec<Id>],
	ks: &[usize],
) -> Result<SearchReport>
where
	Id: Eq + Hash,
{
	ensure_paired(predictions.len(), truth.len())?;

	let mut cutoffs = Vec::with_capacity(ks.len());

	for k in ks {
		cutoffs.push(CutoffMetrics {
			k: *k,
			recall: recall_at_k(predictions, truth, *k)?,
			precision: precision_at_k(predictions, truth, *k)?,
			ndcg: ndcg_at_k(predictions, truth, *k)?,
		});
	}

	let report = SearchReport {
		query_count: predictions.len(),
		judged_count: truth.iter().filter(|relevant| !relevant.is_empty()).count(),
		mrr: mean_reciprocal_rank(predictions, truth)?,
		cutoffs,
	};

	tracing::debug!(
		queries = report.query_count,
		judged = report.judged_count,
		mrr = report.mrr,
		"Evaluated search rankings."
	);

	Ok(report)
}

/// Per-query diagnostics at cutoff `k`. Queries without relevant items are reported with zero
/// scores. `query_ids` defaults to `q0`, `q1`, ...
pub fn per_query_metrics<Id>(
	predictions: &[Vec<Id>],
	truth: &[Vec<Id>],
	query_ids: Option<&[String]>,
	k: usize,
) -> Result<Vec<QueryMetrics>>
where
	Id: Eq + Hash,
{
	ensure_paired(predictions.len(), truth.len())?;

	if let Some(ids) = query_ids
		&& ids.len() != predictions.len()
	{
		return Err(Error::invalid(format!(
			"Got {} query ids for {} queries.",
			ids.len(),
			predictions.len()
		)));
	}

	let mut out = Vec::with_capacity(predictions.len());

	for (idx, (predicted, relevant)) in predictions.iter().zip(truth).enumerate() {
		let relevant: HashSet<&Id> = relevant.iter().collect();
		let hits = hits_at(predicted, &relevant, k);
		let first_hit = first_hit_rank(predicted, &relevant);
		let query_id = match query_ids {
			Some(ids) => ids[idx].clone(),
			None => format!("q{idx}"),
		};
		let judged = !relevant.is_empty();

		out.push(QueryMetrics {
			query_id,
			num_relevant: relevant.len(),
			hit: hits > 0,
			first_hit_rank: first_hit,
			recall: if judged { hits as f64 / relevant.len() as f64 } else { 0.0 },
			precision: precision(predicted, &relevant, k),
			rr: first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0),
			ndcg: if judged { ndcg(predicted, &relevant, k) } else { 0.0 },
		});
	}

	Ok(out)
}

fn ensure_paired(predictions: usize, truth: usize) -> Result<()> {
	if predictions != truth {
		return Err(Error::invalid(format!(
			"Got {predictions} prediction lists and {truth} ground-truth sets."
		)));
	}

	Ok(())
}

/// Averages `score` over queries with a non-empty relevant set; 0.0 when there are none.
fn average<Id, F>(predictions: &[Vec<Id>], truth: &[Vec<Id>], score: F) -> Result<f64>
where
	Id: Eq + Hash,
	F: Fn(&[Id], &HashSet<&Id>) -> f64,
{
	ensure_paired(predictions.len(), truth.len())?;

	let mut sum = 0.0_f64;
	let mut count = 0_usize;

	for (predicted, relevant) in predictions.iter().zip(truth) {
		let relevant: HashSet<&Id> = relevant.iter().collect();

		if relevant.is_empty() {
			continue;
		}

		sum += score(predicted.as_slice(), &relevant);
		count += 1;
	}

	Ok(if count == 0 { 0.0 } else { sum / count as f64 })
}

/// Distinct relevant ids among the first `k` predictions.
fn hits_at<Id>(predicted: &[Id], relevant: &HashSet<&Id>, k: usize) -> usize
where
	Id: Eq + Hash,
{
	predicted.iter().take(k).filter(|id| relevant.contains(id)).collect::<HashSet<_>>().len()
}

fn precision<Id>(predicted: &[Id], relevant: &HashSet<&Id>, k: usize) -> f64
where
	Id: Eq + Hash,
{
	if k == 0 {
		return 0.0;
	}

	hits_at(predicted, relevant, k) as f64 / k as f64
}

fn first_hit_rank<Id>(predicted: &[Id], relevant: &HashSet<&Id>) -> Option<usize>
where
	Id: Eq + Hash,
{
	predicted.iter().position(|id| relevant.contains(id)).map(|idx| idx + 1)
}

fn ndcg<Id>(predicted: &[Id], relevant: &HashSet<&Id>, k: usize) -> f64
where
	Id: Eq + Hash,
{
	let mut credited: HashSet<&Id> = HashSet::new();
	let dcg: f64 = predicted
		.iter()
		.take(k)
		.enumerate()
		.filter(|(_, id)| relevant.contains(id) && credited.insert(*id))
		.map(|(idx, _)| discount(idx + 1))
		.sum();
	let idcg: f64 = (1..=relevant.len().min(k)).map(discount).sum();

	if idcg > 0.0 { dcg / idcg } else { 0.0 }
}

fn discount(rank: usize) -> f64 {
	1.0 / (rank as f64 + 1.0).log2()
}
