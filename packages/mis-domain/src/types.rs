use serde::{Deserialize, Serialize};

/// A candidate identifier paired with a provider-specific score.
///
/// Scores from different providers live on different scales and are only comparable after
/// normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate<Id> {
	pub id: Id,
	pub score: f32,
}
impl<Id> ScoredCandidate<Id> {
	pub fn new(id: Id, score: f32) -> Self {
		Self { id, score }
	}
}
impl<Id> From<(Id, f32)> for ScoredCandidate<Id> {
	fn from((id, score): (Id, f32)) -> Self {
		Self { id, score }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
	pub label: String,
	pub score: f32,
}

pub fn candidate_ids<Id>(candidates: &[ScoredCandidate<Id>]) -> Vec<Id>
where
	Id: Clone,
{
	candidates.iter().map(|candidate| candidate.id.clone()).collect()
}
