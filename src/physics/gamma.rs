//! Gamma-decay fingerprint comparison.
//!
//! Two levels that are the same physical state should decay through the same
//! transitions. Datasets differ in sensitivity, so the smaller list is
//! compared against the larger one without penalizing the excess: a list
//! fully contained in the other scores 1.0.
//!
//! Matching is greedy in list order, not a global assignment.

use serde::Serialize;

use crate::config::GammaConfig;
use crate::data::model::{GammaTransition, Measurement};

/// Relative intensities are rescaled so the strongest line of a list is this.
const INTENSITY_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GammaMode {
    /// Not enough data on one side; the neutral score was returned.
    Neutral,
    /// Both lists carry intensities: weighted overlap.
    Intensity,
    /// Energies only: fraction of the smaller list that found a partner.
    Binary,
}

/// Outcome of comparing two gamma lists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GammaComparison {
    pub mode: GammaMode,
    pub matched: usize,
    pub score: f64,
}

/// Similarity in [0, 1] of two gamma-decay lists.
pub fn gamma_similarity(a: &[GammaTransition], b: &[GammaTransition], config: &GammaConfig) -> f64 {
    compare_gammas(a, b, config).score
}

pub fn compare_gammas(
    a: &[GammaTransition],
    b: &[GammaTransition],
    config: &GammaConfig,
) -> GammaComparison {
    let a = clean(a, config);
    let b = clean(b, config);

    if a.is_empty() || b.is_empty() {
        return GammaComparison {
            mode: GammaMode::Neutral,
            matched: 0,
            score: config.neutral_score,
        };
    }

    if has_intensity(&a) && has_intensity(&b) {
        intensity_overlap(&a, &b, config)
    } else {
        binary_overlap(&a, &b, config)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct CleanGamma {
    energy: Measurement,
    intensity: Option<Measurement>,
}

fn clean(list: &[GammaTransition], config: &GammaConfig) -> Vec<CleanGamma> {
    let mut out: Vec<CleanGamma> = list
        .iter()
        .filter(|g| g.energy.value.is_finite() && g.energy.value > 0.0)
        .map(|g| {
            let energy_unc = if g.energy.uncertainty > 0.0 {
                g.energy.uncertainty
            } else {
                config.default_energy_uncertainty
            };
            let intensity = g.intensity.filter(|i| i.value.is_finite()).map(|i| {
                let unc = if i.uncertainty > 0.0 {
                    i.uncertainty
                } else {
                    config.default_intensity_uncertainty(i.value)
                };
                Measurement::new(i.value, unc)
            });
            CleanGamma {
                energy: Measurement::new(g.energy.value, energy_unc),
                intensity,
            }
        })
        .collect();

    if out.len() < list.len() {
        log::trace!("dropped {} gamma(s) with non-positive energy", list.len() - out.len());
    }

    let max = out
        .iter()
        .filter_map(|g| g.intensity.map(|i| i.value))
        .fold(f64::NEG_INFINITY, f64::max);

    if max > 0.0 {
        let factor = INTENSITY_SCALE / max;
        for g in &mut out {
            if let Some(i) = &mut g.intensity {
                i.value *= factor;
                i.uncertainty *= factor;
            }
        }
    } else {
        // No positive intensity anywhere: treat the list as energies only.
        for g in &mut out {
            g.intensity = None;
        }
    }
    out
}

fn has_intensity(list: &[CleanGamma]) -> bool {
    list.iter().any(|g| g.intensity.is_some())
}

fn total_intensity(list: &[CleanGamma]) -> f64 {
    list.iter().filter_map(|g| g.intensity.map(|i| i.value)).sum()
}

// ---------------------------------------------------------------------------
// Intensity mode
// ---------------------------------------------------------------------------

/// Weighted overlap normalized by the smaller list.
///
/// Each matched pair contributes both intensities when they agree within
/// `intensity_consistency_sigma`, or twice the weaker one when they do not.
/// The accumulated overlap is divided by twice the smaller total, which is
/// the same as summing the pair average (or the weaker intensity) and
/// normalizing by the smaller total.
fn intensity_overlap(a: &[CleanGamma], b: &[CleanGamma], config: &GammaConfig) -> GammaComparison {
    let mut claimed = vec![false; b.len()];
    let mut overlap = 0.0;
    let mut matched = 0;

    for ga in a {
        let mut best: Option<(usize, f64)> = None;
        for (j, gb) in b.iter().enumerate() {
            if claimed[j] {
                continue;
            }
            let z = ga.energy.z_score(&gb.energy);
            if z <= config.energy_window_sigma && best.map_or(true, |(_, bz)| z < bz) {
                best = Some((j, z));
            }
        }
        let Some((j, _)) = best else {
            continue;
        };
        claimed[j] = true;
        matched += 1;

        if let (Some(ia), Some(ib)) = (ga.intensity, b[j].intensity) {
            if ia.z_score(&ib) <= config.intensity_consistency_sigma {
                overlap += ia.value + ib.value;
            } else {
                overlap += 2.0 * ia.value.min(ib.value);
            }
        }
    }

    let denom = 2.0 * total_intensity(a).min(total_intensity(b));
    let score = if denom > 0.0 {
        (overlap / denom).min(1.0)
    } else {
        config.neutral_score
    };

    GammaComparison {
        mode: GammaMode::Intensity,
        matched,
        score,
    }
}

// ---------------------------------------------------------------------------
// Binary mode
// ---------------------------------------------------------------------------

fn binary_overlap(a: &[CleanGamma], b: &[CleanGamma], config: &GammaConfig) -> GammaComparison {
    let mut claimed = vec![false; b.len()];
    let mut matched = 0;

    for ga in a {
        let hit = b.iter().enumerate().position(|(j, gb)| {
            !claimed[j] && ga.energy.z_score(&gb.energy) <= config.energy_window_sigma
        });
        if let Some(j) = hit {
            claimed[j] = true;
            matched += 1;
        }
    }

    let score = matched as f64 / a.len().min(b.len()) as f64;
    GammaComparison {
        mode: GammaMode::Binary,
        matched,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn g(e: f64, de: f64) -> GammaTransition {
        GammaTransition::new(Measurement::new(e, de), None)
    }

    fn gi(e: f64, de: f64, i: f64, di: f64) -> GammaTransition {
        GammaTransition::new(Measurement::new(e, de), Some(Measurement::new(i, di)))
    }

    fn cfg() -> GammaConfig {
        GammaConfig::default()
    }

    #[test]
    fn empty_side_is_neutral() {
        let c = compare_gammas(&[], &[g(100.0, 1.0)], &cfg());
        assert_eq!(c.mode, GammaMode::Neutral);
        assert_eq!(c.score, 0.5);
    }

    #[test]
    fn non_positive_energies_are_dropped() {
        let c = compare_gammas(&[g(0.0, 1.0), g(-5.0, 1.0)], &[g(100.0, 1.0)], &cfg());
        assert_eq!(c.mode, GammaMode::Neutral);
    }

    #[test]
    fn neutral_score_comes_from_config() {
        let config = GammaConfig {
            neutral_score: 0.25,
            ..GammaConfig::default()
        };
        assert_eq!(gamma_similarity(&[], &[], &config), 0.25);
    }

    #[test]
    fn binary_mode_normalizes_by_smaller_list() {
        let a = [g(500.0, 1.0), g(1000.0, 1.0)];
        let b = [g(1001.0, 1.0), g(200.0, 1.0), g(499.0, 1.0), g(3000.0, 1.0)];
        let c = compare_gammas(&a, &b, &cfg());
        assert_eq!(c.mode, GammaMode::Binary);
        assert_eq!(c.matched, 2);
        assert_abs_diff_eq!(c.score, 1.0);
    }

    #[test]
    fn binary_mode_takes_lowest_index_in_window() {
        // Both b entries are within 3 sigma of a[0]; it claims index 0 even
        // though index 1 is closer, and a[1] is out of reach of index 1.
        let a = [g(100.0, 0.5), g(103.0, 0.5)];
        let b = [g(101.5, 0.5), g(100.0, 0.5)];
        let c = compare_gammas(&a, &b, &cfg());
        assert_eq!(c.matched, 1);
        assert_abs_diff_eq!(c.score, 0.5);
    }

    #[test]
    fn one_sided_intensity_falls_back_to_binary() {
        let a = [gi(500.0, 1.0, 100.0, 5.0)];
        let b = [g(500.5, 1.0)];
        assert_eq!(compare_gammas(&a, &b, &cfg()).mode, GammaMode::Binary);
    }

    #[test]
    fn missing_energy_uncertainty_uses_default() {
        // 2.5 keV apart: inside 3 sigma with the 1 keV default on both sides.
        let a = [g(500.0, 0.0)];
        let b = [g(502.5, 0.0)];
        assert_abs_diff_eq!(gamma_similarity(&a, &b, &cfg()), 1.0);
        let far = [g(505.0, 0.0)];
        assert_abs_diff_eq!(gamma_similarity(&a, &far, &cfg()), 0.0);
    }

    #[test]
    fn subset_scores_one_despite_excess() {
        let a = [gi(1000.0, 1.0, 100.0, 5.0), gi(500.0, 1.0, 40.0, 4.0)];
        let b = [
            gi(1000.3, 1.0, 100.0, 5.0),
            gi(800.0, 1.0, 70.0, 5.0),
            gi(500.2, 1.0, 40.0, 4.0),
            gi(250.0, 1.0, 90.0, 5.0),
        ];
        let c = compare_gammas(&a, &b, &cfg());
        assert_eq!(c.mode, GammaMode::Intensity);
        assert_eq!(c.matched, 2);
        assert_abs_diff_eq!(c.score, 1.0);
        // Symmetric in which side is the subset.
        assert_abs_diff_eq!(gamma_similarity(&b, &a, &cfg()), 1.0);
    }

    #[test]
    fn consistent_intensities_count_as_average() {
        let a = [
            gi(1000.0, 1.0, 100.0, 10.0),
            gi(500.0, 1.0, 80.0, 10.0),
            gi(700.0, 1.0, 50.0, 5.0),
        ];
        let b = [gi(1000.0, 1.0, 100.0, 10.0), gi(500.0, 1.0, 100.0, 10.0)];
        // z(80, 100) = 1.41: the pair contributes 80 + 100 rather than 2 * 80.
        let score = gamma_similarity(&a, &b, &cfg());
        assert_abs_diff_eq!(score, 380.0 / 400.0, epsilon = 1e-12);
        assert!(score > 360.0 / 400.0);
    }

    #[test]
    fn inconsistent_intensities_count_as_minimum() {
        let a = [gi(1000.0, 1.0, 100.0, 1.0), gi(500.0, 1.0, 60.0, 1.0)];
        let b = [
            gi(1000.0, 1.0, 100.0, 1.0),
            gi(500.0, 1.0, 20.0, 1.0),
            gi(300.0, 1.0, 100.0, 1.0),
        ];
        assert_abs_diff_eq!(gamma_similarity(&a, &b, &cfg()), 240.0 / 320.0, epsilon = 1e-12);
    }

    #[test]
    fn intensities_are_rescaled_per_list() {
        // 80 and 100 are each the strongest line of their list.
        let a = [gi(1400.0, 1.0, 80.0, 10.0)];
        let b = [gi(1400.0, 1.0, 100.0, 10.0)];
        assert_abs_diff_eq!(gamma_similarity(&a, &b, &cfg()), 1.0);
    }

    #[test]
    fn intensity_mode_picks_lowest_z() {
        let a = [gi(100.0, 1.0, 100.0, 5.0)];
        let b = [gi(102.0, 1.0, 10.0, 1.0), gi(100.1, 1.0, 100.0, 5.0)];
        // Closest partner is the strong line at index 1.
        let c = compare_gammas(&a, &b, &cfg());
        assert_eq!(c.matched, 1);
        assert_abs_diff_eq!(c.score, 1.0);
    }

    #[test]
    fn score_is_bounded() {
        let a = [gi(100.0, 1.0, 100.0, 50.0), gi(200.0, 1.0, 100.0, 50.0)];
        let b = [gi(100.0, 1.0, 100.0, 50.0)];
        let s = gamma_similarity(&a, &b, &cfg());
        assert!((0.0..=1.0).contains(&s));
    }
}
