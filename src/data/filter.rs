use std::collections::BTreeSet;

use super::model::LevelDataset;

// ---------------------------------------------------------------------------
// Selection predicates: energy window and dataset codes
// ---------------------------------------------------------------------------

/// Inclusive energy bounds in keV. An absent bound does not constrain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyWindow {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl EnergyWindow {
    pub fn contains(&self, energy: f64) -> bool {
        self.min.map_or(true, |lo| energy >= lo) && self.max.map_or(true, |hi| energy <= hi)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Return indices of levels whose energy lies inside `window`.
pub fn filtered_indices(dataset: &LevelDataset, window: &EnergyWindow) -> Vec<usize> {
    dataset
        .levels
        .iter()
        .enumerate()
        .filter(|(_, level)| window.contains(level.energy.value))
        .map(|(i, _)| i)
        .collect()
}

/// Keep the datasets named in `codes` (all of them when `codes` is empty)
/// and restrict each to `window`.
pub fn apply_filters(
    datasets: Vec<LevelDataset>,
    window: &EnergyWindow,
    codes: &BTreeSet<String>,
) -> Vec<LevelDataset> {
    datasets
        .into_iter()
        .filter(|ds| codes.is_empty() || codes.contains(&ds.code))
        .map(|ds| {
            if window.is_unbounded() {
                return ds;
            }
            let kept = filtered_indices(&ds, window);
            log::debug!(
                "dataset {}: {} of {} levels inside energy window",
                ds.code,
                kept.len(),
                ds.len()
            );
            ds.select(&kept)
        })
        .collect()
}
