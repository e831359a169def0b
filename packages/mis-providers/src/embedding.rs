use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::{EmbeddingProvider, Error, Result};
use mis_config::EmbeddingProviderConfig;
use mis_domain::normalize;

/// OpenAI-compatible `/embeddings` client.
///
/// Texts are normalized before encoding so query and catalog vectors share one canonical form.
pub struct HttpEmbedder {
	cfg: EmbeddingProviderConfig,
	client: Client,
}
impl HttpEmbedder {
	pub fn new(cfg: EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.build()?;

		Ok(Self { cfg, client })
	}

	pub fn dimensions(&self) -> usize {
		self.cfg.dimensions as usize
	}
}
impl EmbeddingProvider for HttpEmbedder {
	fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": normalize::normalize_batch(texts, true),
			"dimensions": self.cfg.dimensions,
		});
		let res = self.client.post(url).json(&body).send()?;
		let json: Value = res.error_for_status()?.json()?;
		let vectors = parse_embedding_response(json)?;

		if vectors.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding response has {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}
		if let Some(vector) = vectors.iter().find(|vector| vector.len() != self.dimensions()) {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding dimension mismatch: expected {}, got {}.",
					self.dimensions(),
					vector.len()
				),
			});
		}

		tracing::debug!(
			provider_id = %self.cfg.provider_id,
			count = texts.len(),
			"Embedded texts."
		);

		Ok(vectors)
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let mut vector = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;
			vector.push(number as f32);
		}

		indexed.push((index, vector));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("Failed to parse embeddings.");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_non_numeric_embedding_values() {
		let json = serde_json::json!({ "data": [{ "index": 0, "embedding": ["x"] }] });
		let err = parse_embedding_response(json).expect_err("Expected parse failure.");

		assert!(err.to_string().contains("Embedding value must be numeric."));
	}

	#[test]
	fn rejects_missing_data_array() {
		let err = parse_embedding_response(serde_json::json!({ "object": "list" }))
			.expect_err("Expected parse failure.");

		assert!(err.to_string().contains("missing data array"));
	}
}
