use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::features::LevelFeatures;
use crate::config::ScoringConfig;

// ---------------------------------------------------------------------------
// MatchModel – features → probability
// ---------------------------------------------------------------------------

/// Turns a feature vector into a match probability in [0, 1].
pub trait MatchModel {
    fn probability(&self, features: &LevelFeatures) -> f64;
}

/// Physics vetoes shared by every model: conflicting definite parities rule
/// a match out, and disjoint spin sets scale the probability by the spin
/// feature, which is at most the configured disjoint value.
pub fn apply_vetoes(features: &LevelFeatures, probability: f64) -> f64 {
    let p = if features.parity_conflict {
        0.0
    } else if features.spin_disjoint {
        probability * features.spin_similarity
    } else {
        probability
    };
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

// ---------------------------------------------------------------------------
// Hand-tuned default
// ---------------------------------------------------------------------------

/// Energy similarity scaled by the weighted spin/parity/gamma evidence and by
/// dataset specificity.
#[derive(Debug, Clone, Default)]
pub struct HeuristicModel {
    config: ScoringConfig,
}

impl HeuristicModel {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl MatchModel for HeuristicModel {
    fn probability(&self, f: &LevelFeatures) -> f64 {
        let c = &self.config;
        let total_weight = c.spin_weight + c.parity_weight + c.gamma_weight;
        let evidence = if total_weight > 0.0 {
            (c.spin_weight * f.spin_similarity
                + c.parity_weight * f.parity_similarity
                + c.gamma_weight * f.gamma_similarity)
                / total_weight
        } else {
            c.neutral
        };

        let p = f.energy_similarity
            * (c.evidence_floor + (1.0 - c.evidence_floor) * evidence)
            * (c.specificity_floor + (1.0 - c.specificity_floor) * f.specificity);
        apply_vetoes(f, p)
    }
}

// ---------------------------------------------------------------------------
// Logistic model with externally fitted coefficients
// ---------------------------------------------------------------------------

/// `sigmoid(intercept + Σ wᵢ·xᵢ)` over [`LevelFeatures::as_vector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl LogisticModel {
    pub fn new(intercept: f64, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != LevelFeatures::LEN {
            bail!(
                "expected {} weights ({:?}), got {}",
                LevelFeatures::LEN,
                LevelFeatures::NAMES,
                weights.len()
            );
        }
        Ok(Self { intercept, weights })
    }

    /// Read coefficients from a JSON file: `{"intercept": -4.0, "weights": [...]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading model {}", path.display()))?;
        let model: LogisticModel = serde_json::from_str(&text).context("parsing model JSON")?;
        Self::new(model.intercept, model.weights)
    }
}

impl MatchModel for LogisticModel {
    fn probability(&self, f: &LevelFeatures) -> f64 {
        let logit = self.intercept
            + self
                .weights
                .iter()
                .zip(f.as_vector())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        apply_vetoes(f, 1.0 / (1.0 + (-logit).exp()))
    }
}
