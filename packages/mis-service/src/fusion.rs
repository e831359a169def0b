use std::{cmp::Ordering, collections::HashMap, hash::Hash};

use crate::{Error, Result};
use mis_domain::{
	ScoredCandidate,
	vector::{EPSILON, cmp_f32_desc},
};

/// Min-max scales a candidate list into `[0, 1]`, keyed by id.
///
/// A repeated id keeps its last score. When every score is equal (within `EPSILON`) all members
/// map to `1.0`.
pub fn min_max_normalize<Id>(candidates: &[ScoredCandidate<Id>]) -> HashMap<Id, f32>
where
	Id: Clone + Eq + Hash,
{
	let scores = last_scores(candidates);

	if scores.is_empty() {
		return scores;
	}

	let mut min = f32::INFINITY;
	let mut max = f32::NEG_INFINITY;

	for score in scores.values() {
		min = min.min(*score);
		max = max.max(*score);
	}

	let range = max - min;

	if range < EPSILON {
		return scores.into_keys().map(|id| (id, 1.0)).collect();
	}

	scores.into_iter().map(|(id, score)| (id, (score - min) / range)).collect()
}

/// Blends sparse and dense rankings into one list over the union of their ids.
///
/// `alpha` weights the normalized sparse score and `1 - alpha` the normalized dense score; a side
/// that lacks an id contributes zero. Ties fall back to the raw sparse score (absent last) and
/// then to ascending id.
pub fn combine<Id>(
	sparse: &[ScoredCandidate<Id>],
	dense: &[ScoredCandidate<Id>],
	alpha: f32,
) -> Result<Vec<ScoredCandidate<Id>>>
where
	Id: Clone + Eq + Hash + Ord,
{
	validate_alpha(alpha)?;

	let sparse_norm = min_max_normalize(sparse);
	let dense_norm = min_max_normalize(dense);
	let sparse_raw = last_scores(sparse);
	let mut ids: Vec<Id> = sparse_norm.keys().cloned().collect();

	ids.extend(dense_norm.keys().filter(|id| !sparse_norm.contains_key(*id)).cloned());

	let mut fused: Vec<ScoredCandidate<Id>> = ids
		.into_iter()
		.map(|id| {
			let s = sparse_norm.get(&id).copied().unwrap_or(0.0);
			let d = dense_norm.get(&id).copied().unwrap_or(0.0);

			ScoredCandidate::new(id, alpha * s + (1.0 - alpha) * d)
		})
		.collect();

	fused.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score)
			.then_with(|| cmp_raw_desc(sparse_raw.get(&left.id), sparse_raw.get(&right.id)))
			.then_with(|| left.id.cmp(&right.id))
	});

	tracing::debug!(
		sparse = sparse.len(),
		dense = dense.len(),
		fused = fused.len(),
		alpha,
		"Fused candidate lists."
	);

	Ok(fused)
}

pub(crate) fn validate_alpha(alpha: f32) -> Result<()> {
	if !alpha.is_finite() {
		return Err(Error::invalid("alpha must be a finite number."));
	}
	if !(0.0..=1.0).contains(&alpha) {
		return Err(Error::invalid("alpha must be in the range 0.0-1.0."));
	}

	Ok(())
}

fn last_scores<Id>(candidates: &[ScoredCandidate<Id>]) -> HashMap<Id, f32>
where
	Id: Clone + Eq + Hash,
{
	let mut scores = HashMap::with_capacity(candidates.len());

	for candidate in candidates {
		scores.insert(candidate.id.clone(), candidate.score);
	}

	scores
}

fn cmp_raw_desc(left: Option<&f32>, right: Option<&f32>) -> Ordering {
	match (left, right) {
		(Some(left), Some(right)) => cmp_f32_desc(*left, *right),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidates(raw: &[(u32, f32)]) -> Vec<ScoredCandidate<u32>> {
		raw.iter().copied().map(ScoredCandidate::from).collect()
	}

	#[test]
	fn all_equal_scores_map_to_one() {
		let norm = min_max_normalize(&candidates(&[(1, 0.3), (2, 0.3)]));

		assert_eq!(norm.get(&1), Some(&1.0));
		assert_eq!(norm.get(&2), Some(&1.0));
	}

	#[test]
	fn repeated_id_keeps_last_score() {
		let norm = min_max_normalize(&candidates(&[(1, 9.0), (2, 1.0), (1, 1.0), (3, 5.0)]));

		assert_eq!(norm.get(&1), Some(&0.0));
		assert_eq!(norm.get(&3), Some(&1.0));
	}

	#[test]
	fn ties_prefer_higher_raw_sparse_then_lower_id() {
		// Both ids normalize to 1.0 on their only side, so the fused scores tie at 0.5.
		let fused = combine(&candidates(&[(7, 3.0)]), &candidates(&[(2, 0.4)]), 0.5)
			.expect("Fusion failed.");

		assert_eq!(fused[0].id, 7);
		assert_eq!(fused[1].id, 2);

		let fused = combine(&[], &candidates(&[(9, 0.5), (4, 0.5)]), 0.3).expect("Fusion failed.");

		assert_eq!(fused[0].id, 4);
		assert_eq!(fused[1].id, 9);
	}

	#[test]
	fn rejects_alpha_outside_unit_interval() {
		assert!(combine::<u32>(&[], &[], 1.5).is_err());
		assert!(combine::<u32>(&[], &[], -0.1).is_err());
		assert!(combine::<u32>(&[], &[], f32::NAN).is_err());
	}
}
