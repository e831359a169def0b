use std::sync::Arc;

use mis_domain::{ScoredCandidate, candidate_ids};
use mis_providers::{Bm25Scorer, EmbeddingProvider, FlatIndex, KeywordScorer, VectorIndex};
use mis_service::{
	Error, HybridSearcher, Providers, RetrievalMode, RetrievalSource, SearchRequest, combine,
};
use mis_testkit::{FailingEmbedder, FailingIndex, FailingScorer, HashEmbedder, StaticScorer};

const MENU: [&str; 4] = ["chicken shawarma", "beef burger", "falafel wrap", "شاورما لحم"];

fn candidates(raw: &[(u32, f32)]) -> Vec<ScoredCandidate<u32>> {
	raw.iter().copied().map(ScoredCandidate::from).collect()
}

fn score_of(fused: &[ScoredCandidate<u32>], id: u32) -> f32 {
	fused
		.iter()
		.find(|candidate| candidate.id == id)
		.map(|candidate| candidate.score)
		.unwrap_or(-1.0)
}

fn request(mode: RetrievalMode) -> SearchRequest {
	SearchRequest {
		mode,
		k: 3,
		alpha: 0.5,
		sparse_k: 10,
		dense_k: 10,
		search_quality: Some(32),
		strip_diacritics: true,
	}
}

fn menu_docs() -> Vec<String> {
	MENU.iter().map(|text| mis_domain::normalize::normalize(text, true)).collect()
}

fn flat_index(embedder: &HashEmbedder) -> FlatIndex<u32> {
	let vectors = embedder.embed(&menu_docs()).expect("Failed to embed menu.");
	let mut index = FlatIndex::new(embedder.dimensions);

	index.add(&[0, 1, 2, 3], &vectors, None).expect("Failed to index menu.");

	index
}

fn bm25() -> Bm25Scorer<u32> {
	let mut scorer = Bm25Scorer::new();

	scorer.fit(&menu_docs(), &[0, 1, 2, 3]).expect("Failed to fit BM25.");

	scorer
}

#[test]
fn alpha_extremes_follow_a_single_source() {
	let sparse = candidates(&[(1, 10.0), (2, 5.0), (3, 2.0)]);
	let dense = candidates(&[(2, 0.9), (1, 0.7), (4, 0.5)]);
	let sparse_only = combine(&sparse, &dense, 1.0).expect("Fusion failed.");
	let dense_only = combine(&sparse, &dense, 0.0).expect("Fusion failed.");
	let blended = combine(&sparse, &dense, 0.5).expect("Fusion failed.");

	assert_eq!(sparse_only[0].id, 1);
	assert_eq!(dense_only[0].id, 2);
	assert_eq!(blended.len(), 4);

	let mut ids = candidate_ids(&blended);

	ids.sort_unstable();

	assert_eq!(ids, vec![1, 2, 3, 4]);
	assert_eq!(candidate_ids(&sparse_only)[..3], [1, 2, 3]);
}

#[test]
fn single_sided_ids_keep_their_weighted_normalized_score() {
	let sparse = candidates(&[(1, 10.0), (5, 6.0), (3, 2.0)]);
	let dense = candidates(&[(2, 0.9), (4, 0.5)]);
	let fused = combine(&sparse, &dense, 0.3).expect("Fusion failed.");

	// Sparse-only 5 normalizes to (6 - 2) / 8 = 0.5; dense-only 2 normalizes to 1.0.
	assert!((score_of(&fused, 5) - 0.3 * 0.5).abs() < 1e-6);
	assert!((score_of(&fused, 2) - 0.7).abs() < 1e-6);
	assert!((score_of(&fused, 4) - 0.0).abs() < 1e-6);
	assert_eq!(fused.len(), 5);
	assert!(fused.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn empty_lists_fuse_to_empty_output() {
	assert!(combine::<u32>(&[], &[], 0.4).expect("Fusion failed.").is_empty());

	let dense_only = combine(&[], &candidates(&[(8, 0.2)]), 0.4).expect("Fusion failed.");

	assert!((dense_only[0].score - 0.6).abs() < 1e-6);
}

#[test]
fn sparse_mode_returns_keyword_results() {
	let embedder = HashEmbedder::new(64);
	let searcher = HybridSearcher::new(Providers::new(
		Arc::new(bm25()),
		Arc::new(FailingEmbedder),
		Arc::new(flat_index(&embedder)),
	));
	let response =
		searcher.search("  Beef BURGER ", &request(RetrievalMode::Sparse)).expect("Search failed.");

	assert_eq!(response.normalized_query, "beef burger");
	assert_eq!(response.items[0].id, 1);
	assert!(response.items.len() <= 3);
	assert!(response.timings.sparse_ms.is_some());
	assert!(response.timings.dense_ms.is_none());
}

#[test]
fn keyword_query_keeps_diacritics_when_stripping_is_disabled() {
	let embedder = HashEmbedder::new(64);
	let searcher = HybridSearcher::new(Providers::new(
		Arc::new(bm25()),
		Arc::new(FailingEmbedder),
		Arc::new(flat_index(&embedder)),
	));
	let mut keep = request(RetrievalMode::Sparse);

	keep.strip_diacritics = false;

	let kept = searcher.search("شَاوِرْمَا", &keep).expect("Search failed.");

	assert!(kept.normalized_query.contains('\u{064E}'));
	assert!(kept.items.iter().all(|candidate| candidate.score == 0.0));

	let stripped =
		searcher.search("شَاوِرْمَا", &request(RetrievalMode::Sparse)).expect("Search failed.");

	assert_eq!(stripped.normalized_query, "شاورما");
	assert_eq!(stripped.items[0].id, 3);
	assert!(stripped.items[0].score > 0.0);
}

#[test]
fn dense_mode_embeds_the_normalized_query() {
	let embedder = HashEmbedder::new(64);
	let index = flat_index(&embedder);
	let searcher = HybridSearcher::new(Providers::new(
		Arc::new(FailingScorer),
		Arc::new(embedder),
		Arc::new(index),
	));
	let response = searcher
		.search("شَاوِرْمَا لَحْم", &request(RetrievalMode::Dense))
		.expect("Search failed.");

	assert_eq!(response.items[0].id, 3);
	assert!((response.items[0].score - 1.0).abs() < 1e-4);
	assert!(response.timings.embed_ms.is_some());
}

#[test]
fn hybrid_mode_fuses_both_sources() {
	let embedder = HashEmbedder::new(64);
	let index = flat_index(&embedder);
	let searcher =
		HybridSearcher::new(Providers::new(Arc::new(bm25()), Arc::new(embedder), Arc::new(index)));
	let response = searcher
		.search("Chicken Shawarma", &request(RetrievalMode::Hybrid))
		.expect("Search failed.");

	assert_eq!(response.mode, RetrievalMode::Hybrid);
	assert_eq!(response.items[0].id, 0);
	assert_eq!(response.items.len(), 3);
	assert!(response.failed_sources.is_empty());
	assert!(response.timings.fusion_ms.is_some());
}

#[test]
fn hybrid_mode_degrades_when_keyword_search_fails() {
	let embedder = HashEmbedder::new(64);
	let index = flat_index(&embedder);
	let searcher = HybridSearcher::new(Providers::new(
		Arc::new(FailingScorer),
		Arc::new(embedder),
		Arc::new(index),
	));
	let response =
		searcher.search("falafel wrap", &request(RetrievalMode::Hybrid)).expect("Search failed.");

	assert_eq!(response.failed_sources, vec![RetrievalSource::Sparse]);
	assert_eq!(response.items[0].id, 2);
}

#[test]
fn hybrid_mode_degrades_when_vector_search_fails() {
	let searcher = HybridSearcher::new(Providers::new(
		Arc::new(StaticScorer::new([(7_u32, 3.0), (9, 1.0)])),
		Arc::new(HashEmbedder::new(8)),
		Arc::new(FailingIndex),
	));
	let response =
		searcher.search("anything", &request(RetrievalMode::Hybrid)).expect("Search failed.");

	assert_eq!(response.failed_sources, vec![RetrievalSource::Dense]);
	assert_eq!(candidate_ids(&response.items), vec![7, 9]);
	assert!((response.items[0].score - 0.5).abs() < 1e-6);
}

#[test]
fn hybrid_mode_fails_when_both_sources_fail() {
	let searcher: HybridSearcher<u32> = HybridSearcher::new(Providers::new(
		Arc::new(FailingScorer),
		Arc::new(FailingEmbedder),
		Arc::new(FailingIndex),
	));
	let err = searcher
		.search("anything", &request(RetrievalMode::Hybrid))
		.expect_err("Expected search failure.");

	assert!(matches!(err, Error::Provider { .. }));
}

#[test]
fn single_source_modes_propagate_provider_failures() {
	let searcher: HybridSearcher<u32> = HybridSearcher::new(Providers::new(
		Arc::new(FailingScorer),
		Arc::new(FailingEmbedder),
		Arc::new(FailingIndex),
	));

	assert!(searcher.search("kebab", &request(RetrievalMode::Sparse)).is_err());
	assert!(searcher.search("kebab", &request(RetrievalMode::Dense)).is_err());
}

#[test]
fn unfitted_keyword_scorer_is_a_provider_failure() {
	let searcher: HybridSearcher<u32> = HybridSearcher::new(Providers::new(
		Arc::new(Bm25Scorer::new()),
		Arc::new(FailingEmbedder),
		Arc::new(FailingIndex),
	));
	let err = searcher
		.search("kebab", &request(RetrievalMode::Sparse))
		.expect_err("Expected not-fitted failure.");

	assert!(err.to_string().contains("not fitted"));
}

#[test]
fn rejects_blank_queries_and_invalid_requests() {
	let searcher: HybridSearcher<u32> = HybridSearcher::new(Providers::new(
		Arc::new(StaticScorer::new([(1_u32, 1.0)])),
		Arc::new(FailingEmbedder),
		Arc::new(FailingIndex),
	));
	let mut bad_alpha = request(RetrievalMode::Hybrid);

	bad_alpha.alpha = 1.2;

	let mut zero_k = request(RetrievalMode::Sparse);

	zero_k.k = 0;

	assert!(matches!(
		searcher.search(" \u{064B} ", &request(RetrievalMode::Sparse)),
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(searcher.search("x", &bad_alpha), Err(Error::InvalidRequest { .. })));
	assert!(matches!(searcher.search("x", &zero_k), Err(Error::InvalidRequest { .. })));
}

#[test]
fn retrieval_mode_parses_case_insensitively() {
	assert_eq!("Hybrid".parse::<RetrievalMode>().expect("Parse failed."), RetrievalMode::Hybrid);
	assert_eq!(" dense ".parse::<RetrievalMode>().expect("Parse failed."), RetrievalMode::Dense);
	assert!("fuzzy".parse::<RetrievalMode>().is_err());
}
