pub mod dedup;
pub mod error;
pub mod eval;
pub mod fusion;
pub mod recommend;
pub mod search;
pub mod tagging;

pub use dedup::{
	DedupReport, DisjointSet, PairMetrics, cluster, cluster_with_config, cluster_with_report,
	compute_dedup_pairs, evaluate_dedup_pairs,
};
pub use error::{Error, Result};
pub use eval::{
	CutoffMetrics, QueryMetrics, SearchReport, evaluate_search, mean_reciprocal_rank, ndcg_at_k,
	per_query_metrics, precision_at_k, recall_at_k,
};
pub use fusion::{combine, min_max_normalize};
pub use recommend::ContentRecommender;
pub use search::{
	HybridSearcher, Providers, RetrievalMode, RetrievalSource, SearchRequest, SearchResponse,
	SearchTimings,
};
pub use tagging::{LabelTagger, TaggingMetrics, evaluate_tagging};
