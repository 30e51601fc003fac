use std::collections::HashSet;

use approx::assert_abs_diff_eq;

use level_matcher::cluster::{Cluster, build_clusters};
use level_matcher::config::MatchConfig;
use level_matcher::data::model::{LevelDataset, LevelId};
use level_matcher::data::record::{RawGamma, RawLevel, group_into_datasets};
use level_matcher::physics::gamma::{GammaMode, compare_gammas};
use level_matcher::report::render_report;
use level_matcher::scoring::matrix::{LevelRef, ScoreMatrix};
use level_matcher::scoring::model::HeuristicModel;

fn gamma(energy: &str, intensity: Option<&str>) -> RawGamma {
    RawGamma {
        energy: energy.to_string(),
        intensity: intensity.map(str::to_string),
        ..RawGamma::default()
    }
}

fn raw(dataset: &str, energy: &str, gammas: Vec<RawGamma>) -> RawLevel {
    RawLevel {
        dataset: Some(dataset.to_string()),
        energy: energy.to_string(),
        gammas,
        ..RawLevel::default()
    }
}

/// A and B each see a 1400 keV level decaying by a single line; C sees a
/// 1399 keV level whose matching line is weak and an unrelated 1999 keV level.
fn scenario(config: &MatchConfig) -> Vec<LevelDataset> {
    let records = vec![
        raw("A", "1400", vec![gamma("1400", Some("100"))]),
        raw("B", "1405", vec![gamma("1405", Some("100"))]),
        raw("C", "1399", vec![gamma("1399", Some("8")), gamma("600", Some("100"))]),
        raw("C", "1999", vec![gamma("1999", Some("100"))]),
    ];
    group_into_datasets(records, "X", &config.gamma).unwrap()
}

fn run(datasets: &[LevelDataset], config: &MatchConfig) -> (ScoreMatrix, Vec<Cluster>) {
    let model = HeuristicModel::new(config.scoring.clone());
    let scores = ScoreMatrix::compute(datasets, &model, config);
    let clusters = build_clusters(datasets, &scores, &config.cluster);
    (scores, clusters)
}

fn assert_partition(datasets: &[LevelDataset], clusters: &[Cluster]) {
    let mut seen = HashSet::new();
    for c in clusters {
        let mut codes = HashSet::new();
        for m in &c.members {
            assert!(codes.insert(m.level.id.dataset.clone()));
            assert!(seen.insert(m.level.id.clone()));
        }
    }
    let total: usize = datasets.iter().map(LevelDataset::len).sum();
    assert_eq!(seen.len(), total);
}

#[test]
fn three_dataset_scenario() {
    let config = MatchConfig::default();
    let datasets = scenario(&config);
    let (scores, clusters) = run(&datasets, &config);
    assert_partition(&datasets, &clusters);

    let anchor_cluster = &clusters[0];
    assert_eq!(anchor_cluster.anchor().id, LevelId::new("A", 0));
    assert!(anchor_cluster.member_for("B").is_some());
    assert_eq!(
        anchor_cluster.member_for("C").map(|m| m.level.id.clone()),
        Some(LevelId::new("C", 0))
    );

    // The 1999 keV level stands alone.
    assert_eq!(clusters.len(), 2);
    assert!(clusters[1].is_singleton());
    assert_eq!(clusters[1].anchor().id, LevelId::new("C", 1));

    // A and B agree on their decay, so B scores above C despite the larger
    // energy offset.
    let p_ab = scores.get(LevelRef::new(0, 0), LevelRef::new(1, 0)).unwrap();
    let p_ac = scores.get(LevelRef::new(0, 0), LevelRef::new(2, 0)).unwrap();
    assert!(p_ab > p_ac);
    assert!(scores.get(LevelRef::new(0, 0), LevelRef::new(2, 1)).unwrap() < 1e-6);
}

#[test]
fn weak_line_is_penalized_only_with_intensities() {
    let config = MatchConfig::default();
    let datasets = scenario(&config);
    let a = &datasets[0].levels[0].gamma_decays;
    let c = &datasets[2].levels[0].gamma_decays;

    let with_intensity = compare_gammas(a, c, &config.gamma);
    assert_eq!(with_intensity.mode, GammaMode::Intensity);
    assert!(with_intensity.score < 0.2);

    let stripped: Vec<_> = c
        .iter()
        .cloned()
        .map(|mut g| {
            g.intensity = None;
            g
        })
        .collect();
    let binary = compare_gammas(a, &stripped, &config.gamma);
    assert_eq!(binary.mode, GammaMode::Binary);
    assert_abs_diff_eq!(binary.score, 1.0);
}

#[test]
fn stricter_threshold_leaves_slots_empty() {
    let mut config = MatchConfig::default();
    config.cluster.match_threshold = 0.95;
    let datasets = scenario(&config);
    let (_, clusters) = run(&datasets, &config);
    assert_partition(&datasets, &clusters);
    assert!(clusters.iter().all(Cluster::is_singleton));
    assert_eq!(clusters.len(), 4);
}

#[test]
fn report_lists_every_member() {
    let config = MatchConfig::default();
    let datasets = scenario(&config);
    let (_, clusters) = run(&datasets, &config);
    let text = render_report(&clusters);

    assert!(text.starts_with("Cluster 1:\n  Anchor: A_0 | E=1400±5 keV | Jπ=?\n"));
    assert!(text.contains("    [A] A_0: E=1400±5 keV, Jπ=? (Anchor)\n"));
    assert!(text.contains("    [B] B_0: E=1405±5 keV, Jπ=? (Match Prob: "));
    assert!(text.contains("Cluster 2:\n  Anchor: C_1 | E=1999±5 keV"));
}

/// Deterministic pseudo-random datasets sharing part of a level scheme.
fn synthetic(seed: u64) -> Vec<LevelDataset> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    let jpis = ["0+", "2+", "(1,2)-", "3-", "", "4+", "1/2:5/2", "(2)"];
    let mut records = Vec::new();
    for code in ["A", "B", "C"] {
        for k in 0..40 {
            if next() < 0.3 {
                continue;
            }
            let energy = 100.0 * k as f64 + 4.0 * (next() - 0.5);
            let jpi = jpis[(next() * jpis.len() as f64) as usize % jpis.len()];
            let gammas = (0..(next() * 3.0) as usize)
                .map(|g| {
                    let e = energy - 100.0 * (g + 1) as f64;
                    let intensity = format!("{:.0}", 10.0 + 90.0 * next());
                    gamma(&format!("{e:.1}"), Some(intensity.as_str()))
                })
                .filter(|g| !g.energy.starts_with('-'))
                .collect();
            records.push(RawLevel {
                dataset: Some(code.to_string()),
                energy: format!("{energy:.1}"),
                jpi: Some(jpi.to_string()),
                gammas,
                ..RawLevel::default()
            });
        }
    }
    group_into_datasets(records, "X", &MatchConfig::default().gamma).unwrap()
}

#[test]
fn clusters_partition_synthetic_levels() {
    for seed in [1, 7, 42] {
        for cascade in [true, false] {
            let mut config = MatchConfig::default();
            config.cluster.cascade_anchors = cascade;
            let datasets = synthetic(seed);
            let (_, clusters) = run(&datasets, &config);
            assert_partition(&datasets, &clusters);
        }
    }
}

#[test]
fn clustering_is_deterministic() {
    let config = MatchConfig::default();
    let datasets = synthetic(3);
    let (_, first) = run(&datasets, &config);
    let (_, second) = run(&datasets, &config);
    assert_eq!(render_report(&first), render_report(&second));
}
