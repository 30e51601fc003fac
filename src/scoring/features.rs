use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{MatchConfig, ScoringConfig};
use crate::data::model::{Level, LevelDataset, Parity, SpinParityState};
use crate::physics::gamma::gamma_similarity;

// ---------------------------------------------------------------------------
// LevelFeatures – the stable contract between extraction and match models
// ---------------------------------------------------------------------------

/// Features of one level pair. Every similarity lies in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelFeatures {
    /// Statistical energy distance (informational; not part of the vector).
    pub energy_z: f64,
    pub energy_similarity: f64,
    pub spin_similarity: f64,
    pub parity_similarity: f64,
    pub gamma_similarity: f64,
    /// How distinctive the pair is within their own datasets (1 = unique).
    pub specificity: f64,
    /// The candidate spin sets are disjoint.
    pub spin_disjoint: bool,
    /// Both sides have definite parities and none agree.
    pub parity_conflict: bool,
}

impl LevelFeatures {
    pub const LEN: usize = 5;
    pub const NAMES: [&'static str; Self::LEN] =
        ["energy", "spin", "parity", "gamma", "specificity"];

    /// Feature vector in [`Self::NAMES`] order, as consumed by trained models.
    pub fn as_vector(&self) -> [f64; Self::LEN] {
        [
            self.energy_similarity,
            self.spin_similarity,
            self.parity_similarity,
            self.gamma_similarity,
            self.specificity,
        ]
    }
}

/// Extract the features of a level pair.
///
/// `specificity` is the pair's combined dataset specificity, see
/// [`dataset_specificity`] and [`pair_specificity`].
pub fn extract_features(a: &Level, b: &Level, specificity: f64, config: &MatchConfig) -> LevelFeatures {
    let scoring = &config.scoring;
    let energy_z = a.energy.z_score(&b.energy);
    let spin = compare_spins(&a.spin_parity, &b.spin_parity);
    let parity = compare_parities(&a.spin_parity, &b.spin_parity);

    LevelFeatures {
        energy_z,
        energy_similarity: energy_similarity(energy_z, scoring),
        spin_similarity: spin.score(scoring),
        parity_similarity: parity.score(scoring),
        gamma_similarity: gamma_similarity(&a.gamma_decays, &b.gamma_decays, &config.gamma),
        specificity,
        spin_disjoint: matches!(spin, SpinRelation::Disjoint { .. }),
        parity_conflict: parity == ParityRelation::Conflict,
    }
}

/// `exp(-(z / scale)² / 2)`: 1 at z = 0, monotonically falling to 0.
pub fn energy_similarity(z: f64, config: &ScoringConfig) -> f64 {
    let scale = if config.energy_sigma_scale > 0.0 {
        config.energy_sigma_scale
    } else {
        1.0
    };
    (-0.5 * (z / scale).powi(2)).exp()
}

// ---------------------------------------------------------------------------
// Spin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinRelation {
    /// Either side has no known spin.
    Unknown,
    /// At least one spin value in common.
    Shared { tentative: bool },
    /// No spin value in common.
    Disjoint { tentative: bool },
}

impl SpinRelation {
    pub fn score(&self, config: &ScoringConfig) -> f64 {
        match self {
            SpinRelation::Unknown => config.neutral,
            SpinRelation::Shared { tentative: false } => config.spin_shared_firm,
            SpinRelation::Shared { tentative: true } => config.spin_shared_tentative,
            SpinRelation::Disjoint { tentative: false } => config.spin_disjoint_firm,
            SpinRelation::Disjoint { tentative: true } => config.spin_disjoint_tentative,
        }
    }
}

/// Compare two candidate-state lists by their spin values.
///
/// Sharing through a pair of firm states is a firm match. Tentative flags
/// soften the result but never turn disjoint sets into a match.
pub fn compare_spins(a: &[SpinParityState], b: &[SpinParityState]) -> SpinRelation {
    let known = |states: &[SpinParityState]| -> Vec<(u32, bool)> {
        states
            .iter()
            .filter_map(|s| s.two_times_spin.map(|j2| (j2, s.is_tentative_spin)))
            .collect()
    };
    let a = known(a);
    let b = known(b);
    if a.is_empty() || b.is_empty() {
        return SpinRelation::Unknown;
    }

    let mut shared = false;
    let mut shared_firm = false;
    for &(ja, ta) in &a {
        for &(jb, tb) in &b {
            if ja == jb {
                shared = true;
                shared_firm |= !ta && !tb;
            }
        }
    }

    if shared {
        SpinRelation::Shared {
            tentative: !shared_firm,
        }
    } else {
        let tentative = a.iter().chain(&b).any(|&(_, t)| t);
        SpinRelation::Disjoint { tentative }
    }
}

// ---------------------------------------------------------------------------
// Parity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityRelation {
    Unknown,
    Equal,
    Conflict,
}

impl ParityRelation {
    pub fn score(&self, config: &ScoringConfig) -> f64 {
        match self {
            ParityRelation::Unknown => config.neutral,
            ParityRelation::Equal => 1.0,
            ParityRelation::Conflict => 0.0,
        }
    }
}

/// Compare the definite parities offered by two candidate-state lists.
pub fn compare_parities(a: &[SpinParityState], b: &[SpinParityState]) -> ParityRelation {
    let definite = |states: &[SpinParityState]| -> BTreeSet<Parity> {
        states.iter().filter_map(|s| s.parity).collect()
    };
    let a = definite(a);
    let b = definite(b);
    if a.is_empty() || b.is_empty() {
        ParityRelation::Unknown
    } else if a.intersection(&b).next().is_some() {
        ParityRelation::Equal
    } else {
        ParityRelation::Conflict
    }
}

// ---------------------------------------------------------------------------
// Dataset specificity
// ---------------------------------------------------------------------------

/// Per-level specificity within its own dataset: `1 / (1 + n)` where `n`
/// counts the other levels that lie within `specificity_window_sigma` in
/// energy and whose spins do not rule them out.
pub fn dataset_specificity(dataset: &LevelDataset, config: &ScoringConfig) -> Vec<f64> {
    let levels = &dataset.levels;
    levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            let rivals = levels
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i
                        && level.energy.z_score(&other.energy) <= config.specificity_window_sigma
                        && !matches!(
                            compare_spins(&level.spin_parity, &other.spin_parity),
                            SpinRelation::Disjoint { .. }
                        )
                })
                .count();
            1.0 / (1.0 + rivals as f64)
        })
        .collect()
}

/// A pair is only as specific as its less specific member.
pub fn pair_specificity(a: f64, b: f64) -> f64 {
    a.min(b)
}
