use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use level_matcher::cluster::build_clusters;
use level_matcher::config::MatchConfig;
use level_matcher::data::filter::{EnergyWindow, apply_filters};
use level_matcher::data::loader::load_datasets;
use level_matcher::data::model::LevelDataset;
use level_matcher::report::{clusters_to_json, render_report};
use level_matcher::scoring::matrix::ScoreMatrix;
use level_matcher::scoring::model::{HeuristicModel, LogisticModel, MatchModel};

/// Match levels across nuclear datasets and print the resulting clusters.
#[derive(Debug, Parser)]
#[command(name = "level-matcher", version)]
struct Cli {
    /// Level files (.json, .csv, .parquet); datasets keep their load order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON configuration overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON logistic-model coefficients; the heuristic model is used otherwise.
    #[arg(long)]
    model: Option<PathBuf>,

    #[arg(long)]
    min_energy: Option<f64>,

    #[arg(long)]
    max_energy: Option<f64>,

    /// Comma-separated dataset codes to keep.
    #[arg(long, value_delimiter = ',')]
    datasets: Vec<String>,

    /// Override the cluster match threshold.
    #[arg(long)]
    threshold: Option<f64>,

    /// Write pairwise probabilities (JSON) here.
    #[arg(long)]
    scores_out: Option<PathBuf>,

    /// Only export pairs at or above this probability.
    #[arg(long, default_value_t = 0.01)]
    scores_floor: f64,

    /// Write the clusters as JSON here.
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::default(),
    };
    if let Some(t) = cli.threshold {
        config.cluster.match_threshold = t;
    }

    let mut datasets: Vec<LevelDataset> = Vec::new();
    for path in &cli.files {
        for ds in load_datasets(path, &config.gamma)? {
            if datasets.iter().any(|d| d.code == ds.code) {
                bail!("dataset {} appears in more than one file", ds.code);
            }
            datasets.push(ds);
        }
    }

    let window = EnergyWindow {
        min: cli.min_energy,
        max: cli.max_energy,
    };
    let codes: BTreeSet<String> = cli.datasets.iter().cloned().collect();
    let datasets = apply_filters(datasets, &window, &codes);
    if datasets.is_empty() {
        bail!("no datasets left to match");
    }

    let model: Box<dyn MatchModel> = match &cli.model {
        Some(path) => Box::new(LogisticModel::from_file(path)?),
        None => Box::new(HeuristicModel::new(config.scoring.clone())),
    };

    let scores = ScoreMatrix::compute(&datasets, model.as_ref(), &config);
    let clusters = build_clusters(&datasets, &scores, &config.cluster);
    log::info!(
        "{} clusters from {} levels in {} datasets",
        clusters.len(),
        datasets.iter().map(|d| d.len()).sum::<usize>(),
        datasets.len()
    );

    if let Some(path) = &cli.scores_out {
        let json = serde_json::to_string_pretty(&scores.entries(cli.scores_floor))
            .context("serializing scores")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &cli.json_out {
        let json = clusters_to_json(&clusters).context("serializing clusters")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    print!("{}", render_report(&clusters));
    Ok(())
}
