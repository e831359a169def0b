use std::{
	collections::{HashMap, HashSet},
	hash::Hash,
	sync::RwLock,
};

use crate::{Error, Result};
use mis_config::Recommend;
use mis_domain::{
	ScoredCandidate,
	vector::{cmp_f32_desc, cosine_similarity, l2_normalize, mean},
};

/// Content-based recommender over a fixed item catalog.
///
/// Profiles and popularity live behind separate locks; no method holds both at once.
pub struct ContentRecommender<Id> {
	catalog: Vec<(Id, Vec<f32>)>,
	positions: HashMap<Id, usize>,
	profiles: RwLock<HashMap<String, Vec<f32>>>,
	popularity: RwLock<HashMap<Id, u64>>,
}
impl<Id> ContentRecommender<Id>
where
	Id: Clone + Eq + Hash,
{
	pub fn new(item_ids: Vec<Id>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
		if item_ids.len() != embeddings.len() {
			return Err(Error::invalid(format!(
				"Got {} catalog ids and {} embeddings.",
				item_ids.len(),
				embeddings.len()
			)));
		}
		if let Some(first) = embeddings.first()
			&& embeddings.iter().any(|vector| vector.len() != first.len())
		{
			return Err(Error::invalid("Catalog embeddings must share one dimension."));
		}

		let mut positions = HashMap::with_capacity(item_ids.len());

		for (pos, id) in item_ids.iter().enumerate() {
			if positions.insert(id.clone(), pos).is_some() {
				return Err(Error::invalid(format!("Catalog id at position {pos} is a duplicate.")));
			}
		}

		Ok(Self {
			catalog: item_ids.into_iter().zip(embeddings).collect(),
			positions,
			profiles: RwLock::new(HashMap::new()),
			popularity: RwLock::new(HashMap::new()),
		})
	}

	pub fn len(&self) -> usize {
		self.catalog.len()
	}

	pub fn is_empty(&self) -> bool {
		self.catalog.is_empty()
	}

	pub fn has_profile(&self, user: &str) -> bool {
		self.profiles.read().unwrap_or_else(|err| err.into_inner()).contains_key(user)
	}

	pub fn popularity(&self, item: &Id) -> u64 {
		let popularity = self.popularity.read().unwrap_or_else(|err| err.into_inner());

		popularity.get(item).copied().unwrap_or(0)
	}

	/// Rebuilds the profile of `user` from the full interaction list.
	///
	/// Every known id bumps its popularity once per occurrence. Unknown ids are skipped. Returns
	/// `false` and leaves the profile untouched when no id is known.
	pub fn update_profile(&self, user: &str, interacted: &[Id]) -> bool {
		let known: Vec<usize> =
			interacted.iter().filter_map(|id| self.positions.get(id).copied()).collect();

		if known.is_empty() {
			tracing::debug!(user, "No known items in interaction history.");

			return false;
		}

		{
			let mut popularity = self.popularity.write().unwrap_or_else(|err| err.into_inner());

			for pos in &known {
				*popularity.entry(self.catalog[*pos].0.clone()).or_insert(0) += 1;
			}
		}

		let Some(centroid) = mean(known.iter().map(|pos| self.catalog[*pos].1.as_slice())) else {
			return false;
		};
		let profile = l2_normalize(&centroid);

		self.profiles
			.write()
			.unwrap_or_else(|err| err.into_inner())
			.insert(user.to_string(), profile);

		tracing::debug!(user, items = known.len(), "Updated user profile.");

		true
	}

	/// Uses only the most recent `history_limit` interactions, oldest first in `history`.
	pub fn update_profile_recent(&self, user: &str, history: &[Id], history_limit: usize) -> bool {
		let start = history.len().saturating_sub(history_limit);

		self.update_profile(user, &history[start..])
	}

	/// [`ContentRecommender::update_profile_recent`] with `recommend.history_limit`.
	pub fn update_profile_with(&self, cfg: &Recommend, user: &str, history: &[Id]) -> bool {
		self.update_profile_recent(user, history, cfg.history_limit as usize)
	}

	/// [`ContentRecommender::recommend_for_user`] with `recommend.k` and
	/// `recommend.popularity_boost`.
	pub fn recommend_for_user_with(
		&self,
		cfg: &Recommend,
		user: &str,
		exclude: &[Id],
	) -> Vec<ScoredCandidate<Id>> {
		self.recommend_for_user(user, cfg.k as usize, exclude, cfg.popularity_boost)
	}

	/// Ranks the catalog against the profile of `user`, falling back to popularity when the user
	/// has none.
	pub fn recommend_for_user(
		&self,
		user: &str,
		k: usize,
		exclude: &[Id],
		popularity_boost: f32,
	) -> Vec<ScoredCandidate<Id>> {
		let profile =
			self.profiles.read().unwrap_or_else(|err| err.into_inner()).get(user).cloned();
		let Some(profile) = profile else {
			return self.recommend_popular(k, exclude);
		};
		let popularity = self.popularity.read().unwrap_or_else(|err| err.into_inner()).clone();
		let max_popularity = popularity.values().copied().max().unwrap_or(0);
		let boost = popularity_boost.is_finite() && popularity_boost > 0.0 && max_popularity > 0;
		let exclude: HashSet<&Id> = exclude.iter().collect();
		let mut scored: Vec<ScoredCandidate<Id>> = self
			.catalog
			.iter()
			.filter(|(id, _)| !exclude.contains(id))
			.map(|(id, vector)| {
				let mut score = cosine_similarity(&profile, vector);

				if boost {
					let count = popularity.get(id).copied().unwrap_or(0);

					score += popularity_boost * (count as f32 / max_popularity as f32);
				}

				ScoredCandidate::new(id.clone(), score)
			})
			.collect();

		scored.sort_by(|left, right| cmp_f32_desc(left.score, right.score));
		scored.truncate(k);

		scored
	}

	/// Catalog items most similar to `item`. An unknown item yields nothing.
	pub fn recommend_similar_items(
		&self,
		item: &Id,
		k: usize,
		exclude_self: bool,
	) -> Vec<ScoredCandidate<Id>> {
		let Some(pos) = self.positions.get(item) else {
			return Vec::new();
		};
		let anchor = &self.catalog[*pos].1;
		let mut scored: Vec<ScoredCandidate<Id>> = self
			.catalog
			.iter()
			.filter(|(id, _)| !(exclude_self && id == item))
			.map(|(id, vector)| ScoredCandidate::new(id.clone(), cosine_similarity(anchor, vector)))
			.collect();

		scored.sort_by(|left, right| cmp_f32_desc(left.score, right.score));
		scored.truncate(k);

		scored
	}

	/// Items by interaction count, padded with the rest of the catalog at score zero.
	pub fn recommend_popular(&self, k: usize, exclude: &[Id]) -> Vec<ScoredCandidate<Id>> {
		let exclude: HashSet<&Id> = exclude.iter().collect();
		let popularity = self.popularity.read().unwrap_or_else(|err| err.into_inner()).clone();
		let mut popular: Vec<(usize, u64)> = popularity
			.iter()
			.filter(|(id, count)| **count > 0 && !exclude.contains(id))
			.filter_map(|(id, count)| self.positions.get(id).map(|pos| (*pos, *count)))
			.collect();

		popular.sort_by(|left, right| right.1.cmp(&left.1).then(left.0.cmp(&right.0)));
		popular.truncate(k);

		let mut out: Vec<ScoredCandidate<Id>> = popular
			.iter()
			.map(|(pos, count)| ScoredCandidate::new(self.catalog[*pos].0.clone(), *count as f32))
			.collect();

		if out.len() < k {
			let taken: HashSet<usize> = popular.iter().map(|(pos, _)| *pos).collect();

			out.extend(
				self.catalog
					.iter()
					.enumerate()
					.filter(|(pos, (id, _))| !taken.contains(pos) && !exclude.contains(id))
					.take(k - popular.len())
					.map(|(_, (id, _))| ScoredCandidate::new(id.clone(), 0.0)),
			);
		}

		out
	}
}
