use std::collections::BTreeMap;

use serde::Serialize;

use super::features::{dataset_specificity, extract_features, pair_specificity};
use super::model::MatchModel;
use crate::config::MatchConfig;
use crate::data::model::{LevelDataset, LevelId};

// ---------------------------------------------------------------------------
// ScoreMatrix – probabilities for every cross-dataset level pair
// ---------------------------------------------------------------------------

/// Position of a level: dataset index, then level index within that dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelRef {
    pub dataset: usize,
    pub level: usize,
}

impl LevelRef {
    pub fn new(dataset: usize, level: usize) -> Self {
        Self { dataset, level }
    }
}

/// One flattened entry, for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub level_a: LevelId,
    pub level_b: LevelId,
    pub probability: f64,
}

/// Dense probability tables for each unordered dataset pair.
#[derive(Debug, Clone, Default)]
pub struct ScoreMatrix {
    ids: Vec<Vec<LevelId>>,
    /// `(i, j)` with `i < j` → `levels_i × levels_j` table.
    tables: BTreeMap<(usize, usize), Vec<Vec<f64>>>,
}

impl ScoreMatrix {
    /// Score every level of every dataset against every level of every other
    /// dataset. Pairs are independent of each other.
    pub fn compute(datasets: &[LevelDataset], model: &dyn MatchModel, config: &MatchConfig) -> Self {
        let specificity: Vec<Vec<f64>> = datasets
            .iter()
            .map(|ds| dataset_specificity(ds, &config.scoring))
            .collect();

        let mut tables = BTreeMap::new();
        for i in 0..datasets.len() {
            for j in i + 1..datasets.len() {
                let table: Vec<Vec<f64>> = datasets[i]
                    .levels
                    .iter()
                    .enumerate()
                    .map(|(ia, a)| {
                        datasets[j]
                            .levels
                            .iter()
                            .enumerate()
                            .map(|(ib, b)| {
                                let spec = pair_specificity(specificity[i][ia], specificity[j][ib]);
                                model.probability(&extract_features(a, b, spec, config))
                            })
                            .collect()
                    })
                    .collect();
                log::debug!(
                    "scored {} x {} level pairs for {}-{}",
                    datasets[i].len(),
                    datasets[j].len(),
                    datasets[i].code,
                    datasets[j].code
                );
                tables.insert((i, j), table);
            }
        }

        Self {
            ids: datasets
                .iter()
                .map(|ds| ds.levels.iter().map(|l| l.id.clone()).collect())
                .collect(),
            tables,
        }
    }

    /// Match probability of two levels. Symmetric; levels of the same
    /// dataset, or positions outside the matrix, give `None`.
    pub fn get(&self, a: LevelRef, b: LevelRef) -> Option<f64> {
        let (lo, hi) = if a.dataset <= b.dataset { (a, b) } else { (b, a) };
        self.tables
            .get(&(lo.dataset, hi.dataset))?
            .get(lo.level)?
            .get(hi.level)
            .copied()
    }

    /// All entries with probability at least `floor`, dataset pairs in order.
    pub fn entries(&self, floor: f64) -> Vec<ScoreEntry> {
        let mut out = Vec::new();
        for (&(i, j), table) in &self.tables {
            for (ia, row) in table.iter().enumerate() {
                for (ib, &p) in row.iter().enumerate() {
                    if p >= floor {
                        out.push(ScoreEntry {
                            level_a: self.ids[i][ia].clone(),
                            level_b: self.ids[j][ib].clone(),
                            probability: p,
                        });
                    }
                }
            }
        }
        out
    }
}
