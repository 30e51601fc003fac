use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MatchConfig – every tunable of the scoring and clustering pipeline
// ---------------------------------------------------------------------------

/// Top-level configuration. Any key left out of a config file keeps its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub gamma: GammaConfig,
    pub scoring: ScoringConfig,
    pub cluster: ClusterConfig,
}

impl MatchConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }
}

/// Gamma-decay pattern matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaConfig {
    /// Two transitions may pair up when their energy z-score is at most this.
    pub energy_window_sigma: f64,
    /// Paired intensities within this z-score count as the same signal.
    pub intensity_consistency_sigma: f64,
    /// Energy uncertainty (keV) used when a transition has none.
    pub default_energy_uncertainty: f64,
    /// Returned when either side has no usable transitions.
    pub neutral_score: f64,
    /// Floor for a defaulted intensity uncertainty.
    pub min_intensity_uncertainty: f64,
    /// Defaulted intensity uncertainty as a fraction of the intensity.
    pub relative_intensity_uncertainty: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            energy_window_sigma: 3.0,
            intensity_consistency_sigma: 2.0,
            default_energy_uncertainty: 1.0,
            neutral_score: 0.5,
            min_intensity_uncertainty: 0.5,
            relative_intensity_uncertainty: 0.10,
        }
    }
}

impl GammaConfig {
    /// `max(floor, fraction · I)` for an intensity quoted without uncertainty.
    pub fn default_intensity_uncertainty(&self, intensity: f64) -> f64 {
        self.min_intensity_uncertainty
            .max(self.relative_intensity_uncertainty * intensity.abs())
    }
}

/// Level feature extraction and the default heuristic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Energy similarity is `exp(-(z / scale)² / 2)`.
    pub energy_sigma_scale: f64,
    /// Levels of the same dataset within this many sigma compete for specificity.
    pub specificity_window_sigma: f64,
    /// Feature value when either side has no information.
    pub neutral: f64,
    /// Spin sets overlap through firm assignments on both sides.
    pub spin_shared_firm: f64,
    /// Spin sets overlap only through a tentative assignment.
    pub spin_shared_tentative: f64,
    /// Disjoint spin sets, both firm.
    pub spin_disjoint_firm: f64,
    /// Disjoint spin sets where a tentative assignment is involved.
    pub spin_disjoint_tentative: f64,
    pub spin_weight: f64,
    pub parity_weight: f64,
    pub gamma_weight: f64,
    /// Share of the probability that does not depend on spin/parity/gamma evidence.
    pub evidence_floor: f64,
    /// Share of the probability that does not depend on dataset specificity.
    pub specificity_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            energy_sigma_scale: 1.0,
            specificity_window_sigma: 3.0,
            neutral: 0.5,
            spin_shared_firm: 1.0,
            spin_shared_tentative: 0.85,
            spin_disjoint_firm: 0.0,
            spin_disjoint_tentative: 0.1,
            spin_weight: 0.4,
            parity_weight: 0.2,
            gamma_weight: 0.4,
            evidence_floor: 0.4,
            specificity_floor: 0.7,
        }
    }
}

/// Anchor-based clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// A candidate joins a cluster only with a probability strictly above this.
    pub match_threshold: f64,
    /// Dataset whose levels seed clusters first; defaults to the first dataset.
    pub anchor_dataset: Option<String>,
    /// Let unassigned levels of later datasets seed clusters of their own.
    pub cascade_anchors: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.3,
            anchor_dataset: None,
            cascade_anchors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: MatchConfig =
            serde_json::from_str(r#"{ "cluster": { "match_threshold": 0.6 } }"#).unwrap();
        assert_eq!(cfg.cluster.match_threshold, 0.6);
        assert!(cfg.cluster.cascade_anchors);
        assert_eq!(cfg.gamma, GammaConfig::default());
    }

    #[test]
    fn intensity_uncertainty_default() {
        let g = GammaConfig::default();
        assert_eq!(g.default_intensity_uncertainty(2.0), 0.5);
        assert!((g.default_intensity_uncertainty(80.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "gamma": { "neutral_score": 0.4 } }"#).unwrap();
        let cfg = MatchConfig::from_file(&path).unwrap();
        assert_eq!(cfg.gamma.neutral_score, 0.4);
        assert_eq!(cfg.gamma.energy_window_sigma, 3.0);
    }
}
