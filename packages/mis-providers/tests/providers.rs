use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use mis_config::EmbeddingProviderConfig;
use mis_providers::{
	Bm25Scorer, EmbeddingProvider, Error, FlatIndex, HttpEmbedder, KeywordScorer, VectorIndex,
	auth_headers,
};

fn docs(raw: &[&str]) -> Vec<String> {
	raw.iter().map(|text| text.to_string()).collect()
}

#[test]
fn auth_headers_include_bearer_token() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("menus".to_string()));

	let headers = auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()), Some("Bearer secret"));
	assert_eq!(headers.get("x-tenant").and_then(|v| v.to_str().ok()), Some("menus"));
}

#[test]
fn blank_api_key_omits_authorization() {
	let headers = auth_headers("  ", &Map::new()).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn non_string_default_header_is_rejected() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), serde_json::json!(3));

	let err = auth_headers("", &defaults).expect_err("Expected header failure.");

	assert!(err.to_string().contains("must be strings"));
}

#[test]
fn http_embedder_skips_requests_for_empty_batches() {
	let cfg = EmbeddingProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: String::new(),
		path: "/embeddings".to_string(),
		model: "test".to_string(),
		dimensions: 8,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	};
	let embedder = HttpEmbedder::new(cfg).expect("Failed to build embedder.");

	assert_eq!(embedder.dimensions(), 8);
	assert!(embedder.embed(&[]).expect("Empty batch failed.").is_empty());
}

#[test]
fn bm25_search_before_fit_fails() {
	let scorer: Bm25Scorer<u32> = Bm25Scorer::new();
	let err = scorer.search("chicken", 3).expect_err("Expected not-fitted error.");

	assert!(matches!(err, Error::NotFitted { .. }));
	assert!(err.to_string().contains("Call fit() first."));
}

#[test]
fn bm25_fit_rejects_mismatched_ids() {
	let mut scorer = Bm25Scorer::new();
	let err = scorer.fit(&docs(&["a", "b"]), &[1_u32]).expect_err("Expected length mismatch.");

	assert!(matches!(err, Error::InvalidInput { .. }));
}

#[test]
fn bm25_prefers_shorter_matching_documents() {
	let mut scorer = Bm25Scorer::new();

	scorer
		.fit(
			&docs(&[
				"chicken shawarma wrap",
				"beef burger",
				"falafel wrap",
				"chicken burger",
				"lentil soup",
			]),
			&[0_u32, 1, 2, 3, 4],
		)
		.expect("Failed to fit scorer.");

	let results = scorer.search("chicken", 5).expect("Search failed.");

	assert_eq!(results.len(), 5);
	assert_eq!(results[0].id, 3);
	assert_eq!(results[1].id, 0);
	assert!(results[0].score > results[1].score);
	assert!(results[1].score > 0.0);
	assert!(results[2..].iter().all(|candidate| candidate.score == 0.0));
	// Zero-score ties keep document order.
	assert_eq!(results[2].id, 1);
}

#[test]
fn bm25_truncates_to_k() {
	let mut scorer = Bm25Scorer::new();

	scorer.fit(&docs(&["a b", "b c", "c d"]), &["x", "y", "z"]).expect("Failed to fit scorer.");

	assert_eq!(scorer.search("b", 2).expect("Search failed.").len(), 2);
	assert!(scorer.search("b", 0).expect("Search failed.").is_empty());
}

#[test]
fn bm25_floors_negative_idf_for_ubiquitous_terms() {
	let mut scorer = Bm25Scorer::new();

	scorer
		.fit(
			&docs(&["spicy chicken", "spicy beef", "spicy lamb", "spicy rice soup"]),
			&[1_u32, 2, 3, 4],
		)
		.expect("Failed to fit scorer.");

	let results = scorer.search("spicy", 4).expect("Search failed.");

	assert!(results.iter().all(|candidate| candidate.score > 0.0));
}

#[test]
fn flat_index_returns_nearest_first() {
	let mut index = FlatIndex::new(2);

	index
		.add(&[10_u32, 20, 30], &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]], None)
		.expect("Failed to add vectors.");

	let results = index.search(&[1.0, 0.1], 2, Some(64)).expect("Search failed.");

	assert_eq!(results.len(), 2);
	assert_eq!(results[0].id, 10);
	assert_eq!(results[1].id, 30);
	assert_eq!(index.count(), 3);
}

#[test]
fn flat_index_upserts_existing_ids() {
	let mut index = FlatIndex::new(2);
	let meta = [serde_json::json!({ "name": "old" })];

	index.add(&["a"], &[vec![1.0, 0.0]], Some(meta.as_slice())).expect("Failed to add vectors.");
	index
		.add(&["a"], &[vec![0.0, 1.0]], Some(&[serde_json::json!({ "name": "new" })][..]))
		.expect("Failed to add vectors.");

	assert_eq!(index.count(), 1);
	assert_eq!(index.metadata(&"a"), Some(&serde_json::json!({ "name": "new" })));

	let results = index.search(&[0.0, 1.0], 1, None).expect("Search failed.");

	assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn flat_index_rejects_dimension_mismatch() {
	let mut index: FlatIndex<u32> = FlatIndex::new(3);
	let err = index.add(&[1], &[vec![1.0, 0.0]], None).expect_err("Expected dimension error.");

	assert!(err.to_string().contains("3-dimensional"));
	assert!(index.search(&[1.0], 1, None).is_err());
}

#[test]
fn flat_index_delete_reports_removed_count() {
	let mut index = FlatIndex::new(1);

	index.add(&[1_u32, 2, 3], &[vec![1.0], vec![1.0], vec![1.0]], None).expect("Failed to add.");

	assert_eq!(index.delete(&[2, 9]).expect("Delete failed."), 1);
	assert_eq!(index.count(), 2);

	let ids: Vec<u32> =
		index.search(&[1.0], 5, None).expect("Search failed.").into_iter().map(|c| c.id).collect();

	assert_eq!(ids, vec![1, 3]);
}
