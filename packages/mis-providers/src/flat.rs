use std::{collections::HashMap, hash::Hash};

use serde_json::Value;

use crate::{Error, Result, VectorIndex};
use mis_domain::{
	ScoredCandidate,
	vector::{cmp_f32_desc, cosine_similarity},
};

struct Entry<Id> {
	id: Id,
	vector: Vec<f32>,
	metadata: Option<Value>,
}

/// Exact cosine scan over every stored vector.
///
/// Suitable for tests and small catalogs. The search-quality hint is accepted and ignored.
pub struct FlatIndex<Id> {
	dimensions: usize,
	entries: Vec<Entry<Id>>,
	positions: HashMap<Id, usize>,
}
impl<Id> FlatIndex<Id>
where
	Id: Clone + Eq + Hash,
{
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions, entries: Vec::new(), positions: HashMap::new() }
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	pub fn metadata(&self, id: &Id) -> Option<&Value> {
		self.positions.get(id).and_then(|pos| self.entries[*pos].metadata.as_ref())
	}

	fn reindex(&mut self) {
		self.positions.clear();

		for (pos, entry) in self.entries.iter().enumerate() {
			self.positions.insert(entry.id.clone(), pos);
		}
	}
}
impl<Id> VectorIndex<Id> for FlatIndex<Id>
where
	Id: Clone + Eq + Hash + Send + Sync,
{
	fn add(&mut self, ids: &[Id], vectors: &[Vec<f32>], metadata: Option<&[Value]>) -> Result<()> {
		if ids.len() != vectors.len() {
			return Err(Error::InvalidInput {
				message: format!(
					"Index add received {} ids and {} vectors.",
					ids.len(),
					vectors.len()
				),
			});
		}
		if let Some(metadata) = metadata
			&& metadata.len() != ids.len()
		{
			return Err(Error::InvalidInput {
				message: format!(
					"Index add received {} ids and {} metadata entries.",
					ids.len(),
					metadata.len()
				),
			});
		}
		if let Some(vector) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
			return Err(Error::InvalidInput {
				message: format!(
					"Index expects {}-dimensional vectors, got {}.",
					self.dimensions,
					vector.len()
				),
			});
		}

		for (idx, (id, vector)) in ids.iter().zip(vectors).enumerate() {
			let entry = Entry {
				id: id.clone(),
				vector: vector.clone(),
				metadata: metadata.map(|metadata| metadata[idx].clone()),
			};

			match self.positions.get(id) {
				Some(pos) => self.entries[*pos] = entry,
				None => {
					self.positions.insert(id.clone(), self.entries.len());
					self.entries.push(entry);
				},
			}
		}

		Ok(())
	}

	fn search(
		&self,
		query: &[f32],
		k: usize,
		_search_quality: Option<u32>,
	) -> Result<Vec<ScoredCandidate<Id>>> {
		if query.len() != self.dimensions {
			return Err(Error::InvalidInput {
				message: format!(
					"Index expects {}-dimensional queries, got {}.",
					self.dimensions,
					query.len()
				),
			});
		}

		let mut scored: Vec<(usize, f32)> = self
			.entries
			.iter()
			.enumerate()
			.map(|(pos, entry)| (pos, cosine_similarity(query, &entry.vector)))
			.collect();

		scored.sort_by(|left, right| cmp_f32_desc(left.1, right.1).then(left.0.cmp(&right.0)));

		Ok(scored
			.into_iter()
			.take(k)
			.map(|(pos, score)| ScoredCandidate::new(self.entries[pos].id.clone(), score))
			.collect())
	}

	fn delete(&mut self, ids: &[Id]) -> Result<usize> {
		let before = self.entries.len();

		self.entries.retain(|entry| !ids.contains(&entry.id));

		let removed = before - self.entries.len();

		if removed > 0 {
			self.reindex();
		}

		Ok(removed)
	}

	fn count(&self) -> usize {
		self.entries.len()
	}
}
