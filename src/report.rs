//! Human-readable and JSON renderings of a clustering run.
//!
//! The text grammar is read back by downstream visualizers:
//!
//! ```text
//! Cluster 1:
//!   Anchor: A_0 | E=1400±5 keV | Jπ=2+
//!     [A] A_0: E=1400±5 keV, Jπ=2+ (Anchor)
//!     [B] B_3: E=1405±5 keV, Jπ=(2)+ (Match Prob: 63.9%)
//! ```

use std::fmt::Write as _;

use crate::cluster::{Cluster, ClusterMember};
use crate::data::model::Level;

/// Render all clusters, numbered from 1, separated by blank lines.
pub fn render_report(clusters: &[Cluster]) -> String {
    let mut out = String::new();
    for (n, cluster) in clusters.iter().enumerate() {
        if n > 0 {
            out.push('\n');
        }
        let anchor = cluster.anchor();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Cluster {}:", n + 1);
        let _ = writeln!(
            out,
            "  Anchor: {} | E={}±{} keV | Jπ={}",
            anchor.id,
            anchor.energy.value,
            anchor.energy.uncertainty,
            jpi_label(anchor)
        );
        for member in &cluster.members {
            let _ = writeln!(out, "    {}", member_line(member));
        }
    }
    out
}

fn member_line(member: &ClusterMember) -> String {
    let level = &member.level;
    let status = match member.match_probability {
        None => "Anchor".to_string(),
        Some(p) => format!("Match Prob: {:.1}%", p * 100.0),
    };
    format!(
        "[{}] {}: E={}±{} keV, Jπ={} ({status})",
        level.dataset_code(),
        level.id,
        level.energy.value,
        level.energy.uncertainty,
        jpi_label(level)
    )
}

fn jpi_label(level: &Level) -> &str {
    if level.spin_parity_text.is_empty() {
        "?"
    } else {
        &level.spin_parity_text
    }
}

/// Pretty-printed JSON array of clusters.
pub fn clusters_to_json(clusters: &[Cluster]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{LevelId, Measurement};

    fn level(code: &str, index: usize, energy: f64, unc: f64, jpi: &str) -> Level {
        Level {
            id: LevelId::new(code, index),
            energy: Measurement::new(energy, unc),
            spin_parity_text: jpi.to_string(),
            spin_parity: Vec::new(),
            gamma_decays: Vec::new(),
        }
    }

    fn sample() -> Vec<Cluster> {
        vec![
            Cluster {
                members: vec![
                    ClusterMember {
                        level: level("A", 0, 1400.0, 5.0, "2+"),
                        match_probability: None,
                    },
                    ClusterMember {
                        level: level("B", 3, 1405.0, 5.0, "(2)+"),
                        match_probability: Some(0.6389),
                    },
                ],
            },
            Cluster {
                members: vec![ClusterMember {
                    level: level("C", 1, 1999.5, 0.5, ""),
                    match_probability: None,
                }],
            },
        ]
    }

    #[test]
    fn report_grammar() {
        let text = render_report(&sample());
        let expected = "\
Cluster 1:
  Anchor: A_0 | E=1400±5 keV | Jπ=2+
    [A] A_0: E=1400±5 keV, Jπ=2+ (Anchor)
    [B] B_3: E=1405±5 keV, Jπ=(2)+ (Match Prob: 63.9%)

Cluster 2:
  Anchor: C_1 | E=1999.5±0.5 keV | Jπ=?
    [C] C_1: E=1999.5±0.5 keV, Jπ=? (Anchor)
";
        assert_eq!(text, expected);
    }

    #[test]
    fn json_export_includes_probabilities() {
        let json = clusters_to_json(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["members"][1]["match_probability"], 0.6389);
        assert!(parsed[0]["members"][0]["match_probability"].is_null());
    }
}
