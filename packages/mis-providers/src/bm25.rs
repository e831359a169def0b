use std::collections::HashMap;

use crate::{Error, KeywordScorer, Result};
use mis_domain::{ScoredCandidate, vector::cmp_f32_desc};

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Floor for negative IDF values, as a fraction of the mean IDF.
const IDF_EPSILON: f32 = 0.25;

struct Fitted<Id> {
	ids: Vec<Id>,
	term_freqs: Vec<HashMap<String, u32>>,
	doc_lens: Vec<f32>,
	avg_doc_len: f32,
	idf: HashMap<String, f32>,
}

/// Okapi BM25 over whitespace tokens.
///
/// Documents and queries are expected to be normalized already; this scorer only splits on
/// whitespace.
pub struct Bm25Scorer<Id> {
	fitted: Option<Fitted<Id>>,
}
impl<Id> Bm25Scorer<Id> {
	pub fn new() -> Self {
		Self { fitted: None }
	}

	pub fn is_fitted(&self) -> bool {
		self.fitted.is_some()
	}
}
impl<Id> Default for Bm25Scorer<Id> {
	fn default() -> Self {
		Self::new()
	}
}
impl<Id> KeywordScorer<Id> for Bm25Scorer<Id>
where
	Id: Clone + Send + Sync,
{
	fn fit(&mut self, documents: &[String], ids: &[Id]) -> Result<()> {
		if documents.len() != ids.len() {
			return Err(Error::InvalidInput {
				message: format!(
					"BM25 fit received {} documents and {} ids.",
					documents.len(),
					ids.len()
				),
			});
		}

		let mut term_freqs = Vec::with_capacity(documents.len());
		let mut doc_lens = Vec::with_capacity(documents.len());
		let mut doc_freqs: HashMap<String, u32> = HashMap::new();

		for document in documents {
			let mut freqs: HashMap<String, u32> = HashMap::new();
			let mut len = 0_u32;

			for token in document.split_whitespace() {
				*freqs.entry(token.to_string()).or_insert(0) += 1;
				len += 1;
			}
			for term in freqs.keys() {
				*doc_freqs.entry(term.clone()).or_insert(0) += 1;
			}

			term_freqs.push(freqs);
			doc_lens.push(len as f32);
		}

		let n = documents.len() as f32;
		let avg_doc_len = if documents.is_empty() { 0.0 } else { doc_lens.iter().sum::<f32>() / n };
		let mut idf = HashMap::with_capacity(doc_freqs.len());
		let mut idf_sum = 0.0_f32;
		let mut negative = Vec::new();

		for (term, df) in doc_freqs {
			let df = df as f32;
			let value = (n - df + 0.5).ln() - (df + 0.5).ln();

			idf_sum += value;

			if value < 0.0 {
				negative.push(term.clone());
			}

			idf.insert(term, value);
		}

		if !idf.is_empty() {
			let floor = IDF_EPSILON * idf_sum / idf.len() as f32;

			for term in negative {
				idf.insert(term, floor);
			}
		}

		tracing::debug!(documents = documents.len(), terms = idf.len(), "Fitted BM25 scorer.");

		self.fitted = Some(Fitted { ids: ids.to_vec(), term_freqs, doc_lens, avg_doc_len, idf });

		Ok(())
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate<Id>>> {
		let Some(fitted) = self.fitted.as_ref() else {
			return Err(Error::NotFitted { provider: "BM25" });
		};
		let terms: Vec<&str> = query.split_whitespace().collect();
		let mut scored: Vec<(usize, f32)> = Vec::with_capacity(fitted.ids.len());

		for (idx, freqs) in fitted.term_freqs.iter().enumerate() {
			let len_norm = if fitted.avg_doc_len > 0.0 {
				1.0 - B + B * fitted.doc_lens[idx] / fitted.avg_doc_len
			} else {
				1.0
			};
			let mut score = 0.0_f32;

			for term in &terms {
				let Some(tf) = freqs.get(*term) else { continue };
				let tf = *tf as f32;
				let idf = fitted.idf.get(*term).copied().unwrap_or(0.0);

				score += idf * (tf * (K1 + 1.0)) / (tf + K1 * len_norm);
			}

			scored.push((idx, score));
		}

		scored.sort_by(|left, right| cmp_f32_desc(left.1, right.1).then(left.0.cmp(&right.0)));

		Ok(scored
			.into_iter()
			.take(k)
			.map(|(idx, score)| ScoredCandidate::new(fitted.ids[idx].clone(), score))
			.collect())
	}
}
