pub mod normalize;
pub mod types;
pub mod vector;

pub use types::{ScoredCandidate, ScoredLabel, candidate_ids};
