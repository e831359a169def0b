use std::{
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use mis_config::Config;
use mis_service::{
	PairMetrics, QueryMetrics, SearchReport, TaggingMetrics, evaluate_dedup_pairs,
	evaluate_search, evaluate_tagging, per_query_metrics,
};

#[derive(Debug, Parser)]
#[command(
	version = mis_cli::VERSION,
	rename_all = "kebab",
	styles = mis_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Cutoff to report; repeat for several. Defaults to `eval.ks` from the config.
	#[arg(long = "k", short = 'k', value_name = "N")]
	pub k: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	queries: Vec<EvalQuery>,
	dedup: Option<DedupJudgments>,
	tagging: Option<TaggingJudgments>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: Option<String>,
	predicted_ids: Vec<String>,
	relevant_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DedupJudgments {
	predicted_pairs: Vec<(String, String)>,
	true_pairs: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TaggingJudgments {
	predictions: Vec<Vec<String>>,
	truth: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	settings: EvalSettings,
	summary: SearchReport,
	queries: Vec<QueryReport>,
	#[serde(skip_serializing_if = "Option::is_none")]
	dedup: Option<PairMetrics>,
	#[serde(skip_serializing_if = "Option::is_none")]
	tagging: Option<TaggingMetrics>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	query_count: usize,
	judged_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	ks: Vec<usize>,
	/// Cutoff used for the per-query rows.
	query_k: usize,
	elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	#[serde(skip_serializing_if = "Option::is_none")]
	query: Option<String>,
	#[serde(flatten)]
	metrics: QueryMetrics,
	predicted_ids: Vec<String>,
	relevant_ids: Vec<String>,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let config = mis_config::load(&args.config)?;
	let filter = EnvFilter::try_new(config.service.log_level.as_str())
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let ks = resolve_cutoffs(&args.k, &config)?;
	let dataset = load_dataset(args.dataset.as_path())?;
	let output = evaluate_dataset(args.config.as_path(), dataset, ks)?;

	tracing::info!(
		dataset = %output.dataset.name,
		queries = output.dataset.query_count,
		judged = output.dataset.judged_count,
		mrr = output.summary.mrr,
		"Evaluation finished."
	);

	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn resolve_cutoffs(requested: &[usize], config: &Config) -> color_eyre::Result<Vec<usize>> {
	let mut ks: Vec<usize> = if requested.is_empty() {
		config.eval.ks.iter().map(|k| *k as usize).collect()
	} else {
		requested.to_vec()
	};

	ks.sort_unstable();
	ks.dedup();

	if ks.is_empty() {
		return Err(eyre::eyre!("At least one cutoff is required."));
	}
	if ks.contains(&0) {
		return Err(eyre::eyre!("Cutoffs must be greater than zero."));
	}

	Ok(ks)
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

fn evaluate_dataset(
	config_path: &Path,
	dataset: EvalDataset,
	ks: Vec<usize>,
) -> color_eyre::Result<EvalOutput> {
	let start = Instant::now();
	let query_k = ks.iter().copied().max().unwrap_or(1);
	let query_ids: Vec<String> = dataset
		.queries
		.iter()
		.enumerate()
		.map(|(idx, query)| query.id.clone().unwrap_or_else(|| format!("q{idx}")))
		.collect();
	let (predictions, truth): (Vec<Vec<String>>, Vec<Vec<String>>) = dataset
		.queries
		.iter()
		.map(|query| (query.predicted_ids.clone(), query.relevant_ids.clone()))
		.unzip();
	let summary = evaluate_search(&predictions, &truth, &ks)?;
	let rows = per_query_metrics(&predictions, &truth, Some(query_ids.as_slice()), query_k)?;
	let queries = dataset
		.queries
		.into_iter()
		.zip(rows)
		.map(|(query, metrics)| QueryReport {
			query: query.query,
			metrics,
			predicted_ids: query.predicted_ids,
			relevant_ids: query.relevant_ids,
		})
		.collect();
	let dedup = dataset
		.dedup
		.map(|judgments| evaluate_dedup_pairs(&judgments.predicted_pairs, &judgments.true_pairs));
	let tagging = match dataset.tagging {
		Some(judgments) => Some(evaluate_tagging(&judgments.predictions, &judgments.truth)?),
		None => None,
	};

	Ok(EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.unwrap_or_else(|| "dataset".to_string()),
			query_count: summary.query_count,
			judged_count: summary.judged_count,
		},
		settings: EvalSettings {
			config_path: config_path.display().to_string(),
			ks,
			query_k,
			elapsed_ms: start.elapsed().as_secs_f64() * 1_000.0,
		},
		summary,
		queries,
		dedup,
		tagging,
	})
}
