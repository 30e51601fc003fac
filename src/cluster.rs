//! Anchor-based clustering of levels across datasets.
//!
//! Each cluster stands for one physical level: an anchor plus at most one
//! member from every other dataset. Anchor datasets are processed in turn;
//! within a round every still-unassigned anchor-dataset level opens a
//! cluster, and each other dataset's candidates are handed out greedily by
//! descending probability so a contested level goes to the cluster that
//! wants it most and the loser falls back to its next-best candidate.

use serde::Serialize;

use crate::config::ClusterConfig;
use crate::data::model::{Level, LevelDataset};
use crate::scoring::matrix::{LevelRef, ScoreMatrix};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMember {
    pub level: Level,
    /// Probability of matching the anchor; `None` for the anchor itself.
    pub match_probability: Option<f64>,
}

impl ClusterMember {
    pub fn is_anchor(&self) -> bool {
        self.match_probability.is_none()
    }
}

/// One physical level as seen by the datasets. `members` starts with the
/// anchor and holds at most one level per dataset, in dataset order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub members: Vec<ClusterMember>,
}

impl Cluster {
    pub fn anchor(&self) -> &Level {
        &self.members[0].level
    }

    /// The member contributed by `dataset`, if any.
    pub fn member_for(&self, dataset: &str) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.level.dataset_code() == dataset)
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

struct Draft {
    anchor: LevelRef,
    members: Vec<(LevelRef, f64)>,
}

/// Cluster every level of `datasets` using the pairwise `scores`.
///
/// Every level ends up in exactly one cluster; levels nobody matched become
/// singletons. The output is ordered by anchor energy.
pub fn build_clusters(
    datasets: &[LevelDataset],
    scores: &ScoreMatrix,
    config: &ClusterConfig,
) -> Vec<Cluster> {
    let mut assigned: Vec<Vec<bool>> = datasets.iter().map(|ds| vec![false; ds.len()]).collect();
    let mut drafts: Vec<Draft> = Vec::new();

    for anchor_ds in anchor_order(datasets, config) {
        let mut seeds: Vec<usize> = (0..datasets[anchor_ds].len())
            .filter(|&i| !assigned[anchor_ds][i])
            .collect();
        seeds.sort_by(|&a, &b| {
            let ea = datasets[anchor_ds].levels[a].energy.value;
            let eb = datasets[anchor_ds].levels[b].energy.value;
            ea.total_cmp(&eb).then(a.cmp(&b))
        });

        let first = drafts.len();
        for &i in &seeds {
            assigned[anchor_ds][i] = true;
            drafts.push(Draft {
                anchor: LevelRef::new(anchor_ds, i),
                members: Vec::new(),
            });
        }
        let round = &mut drafts[first..];

        for other in (0..datasets.len()).filter(|&d| d != anchor_ds) {
            fill_slot(round, other, &mut assigned[other], scores, config.match_threshold);
        }

        log::debug!(
            "anchor dataset {}: {} clusters, {} members admitted",
            datasets[anchor_ds].code,
            round.len(),
            round.iter().map(|d| d.members.len()).sum::<usize>()
        );
    }

    // Anything still unclaimed stands alone.
    for (d, flags) in assigned.iter().enumerate() {
        for (i, &taken) in flags.iter().enumerate() {
            if !taken {
                drafts.push(Draft {
                    anchor: LevelRef::new(d, i),
                    members: Vec::new(),
                });
            }
        }
    }

    let level_at = |r: LevelRef| &datasets[r.dataset].levels[r.level];
    drafts.sort_by(|a, b| {
        level_at(a.anchor)
            .energy
            .value
            .total_cmp(&level_at(b.anchor).energy.value)
            .then(a.anchor.cmp(&b.anchor))
    });

    drafts
        .into_iter()
        .map(|mut draft| {
            draft.members.sort_by_key(|(r, _)| r.dataset);
            let mut members = vec![ClusterMember {
                level: level_at(draft.anchor).clone(),
                match_probability: None,
            }];
            members.extend(draft.members.into_iter().map(|(r, p)| ClusterMember {
                level: level_at(r).clone(),
                match_probability: Some(p),
            }));
            Cluster { members }
        })
        .collect()
}

/// Datasets whose levels seed clusters, in order.
fn anchor_order(datasets: &[LevelDataset], config: &ClusterConfig) -> Vec<usize> {
    if datasets.is_empty() {
        return Vec::new();
    }
    let reference = match &config.anchor_dataset {
        Some(code) => datasets.iter().position(|d| &d.code == code).unwrap_or_else(|| {
            log::warn!("anchor dataset {code} not loaded, using {}", datasets[0].code);
            0
        }),
        None => 0,
    };

    let mut order = vec![reference];
    if config.cascade_anchors {
        order.extend((0..datasets.len()).filter(|&d| d != reference));
    }
    order
}

/// Give each cluster of the round at most one level of dataset `other`.
///
/// Candidates above `threshold` are taken in order of descending probability,
/// ties going to the lower-energy anchor and then the lower level index.
fn fill_slot(
    round: &mut [Draft],
    other: usize,
    assigned: &mut [bool],
    scores: &ScoreMatrix,
    threshold: f64,
) {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (k, draft) in round.iter().enumerate() {
        for (c, &taken) in assigned.iter().enumerate() {
            if taken {
                continue;
            }
            if let Some(p) = scores.get(draft.anchor, LevelRef::new(other, c)) {
                if p > threshold {
                    candidates.push((p, k, c));
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut filled = vec![false; round.len()];
    for (p, k, c) in candidates {
        if filled[k] || assigned[c] {
            continue;
        }
        filled[k] = true;
        assigned[c] = true;
        round[k].members.push((LevelRef::new(other, c), p));
    }
}
