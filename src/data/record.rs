use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{GammaTransition, Level, LevelDataset, LevelId, Measurement};
use crate::config::GammaConfig;
use crate::physics::spin_parity::expand_spin_parity;
use crate::physics::uncertainty::infer_uncertainty;

// ---------------------------------------------------------------------------
// Raw records – numbers kept as text so their precision is not lost
// ---------------------------------------------------------------------------

/// A level exactly as a source file reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLevel {
    pub dataset: Option<String>,
    pub energy: String,
    pub energy_unc: Option<String>,
    pub jpi: Option<String>,
    #[serde(default)]
    pub gammas: Vec<RawGamma>,
}

/// A gamma transition exactly as a source file reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGamma {
    pub energy: String,
    pub energy_unc: Option<String>,
    pub intensity: Option<String>,
    pub intensity_unc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_level: Option<usize>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("level energy '{0}' is not a number")]
    LevelEnergy(String),
    #[error("gamma energy '{0}' is not a number")]
    GammaEnergy(String),
    #[error("gamma intensity '{0}' is not a number")]
    GammaIntensity(String),
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

impl RawLevel {
    /// Turn the raw record into a scoring-ready [`Level`].
    ///
    /// Uncertainties that are absent or non-positive are inferred from the
    /// value's written precision, except gamma intensities which fall back
    /// to the configured relative default.
    pub fn into_level(self, id: LevelId, gamma: &GammaConfig) -> Result<Level, RecordError> {
        let energy = measurement(&self.energy, self.energy_unc.as_deref())
            .ok_or_else(|| RecordError::LevelEnergy(self.energy.clone()))?;

        let gamma_decays = self
            .gammas
            .iter()
            .map(|g| g.to_transition(gamma))
            .collect::<Result<Vec<_>, _>>()?;

        let spin_parity_text = self.jpi.unwrap_or_default().trim().to_string();
        let spin_parity = expand_spin_parity(&spin_parity_text);

        Ok(Level {
            id,
            energy,
            spin_parity_text,
            spin_parity,
            gamma_decays,
        })
    }
}

impl RawGamma {
    fn to_transition(&self, config: &GammaConfig) -> Result<GammaTransition, RecordError> {
        let energy = measurement(&self.energy, self.energy_unc.as_deref())
            .ok_or_else(|| RecordError::GammaEnergy(self.energy.clone()))?;

        let intensity = match self.intensity.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => {
                let value = parse_number(text)
                    .ok_or_else(|| RecordError::GammaIntensity(text.to_string()))?;
                let uncertainty = self
                    .intensity_unc
                    .as_deref()
                    .and_then(parse_number)
                    .filter(|u| *u > 0.0)
                    .unwrap_or_else(|| config.default_intensity_uncertainty(value));
                Some(Measurement::new(value, uncertainty))
            }
        };

        Ok(GammaTransition {
            energy,
            intensity,
            final_level: self.final_level,
        })
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Value with its explicit uncertainty, or one inferred from the value text.
fn measurement(value_text: &str, unc_text: Option<&str>) -> Option<Measurement> {
    let value = parse_number(value_text)?;
    let uncertainty = unc_text
        .and_then(parse_number)
        .filter(|u| *u > 0.0)
        .unwrap_or_else(|| infer_uncertainty(value_text));
    Some(Measurement::new(value, uncertainty))
}

/// Group raw records into datasets by code, in first-seen order.
///
/// Records without a dataset code are assigned `default_code`. Level ids
/// count from zero within each dataset.
pub fn group_into_datasets(
    records: Vec<RawLevel>,
    default_code: &str,
    gamma: &GammaConfig,
) -> Result<Vec<LevelDataset>, RecordError> {
    let mut datasets: Vec<LevelDataset> = Vec::new();

    for raw in records {
        let code = raw
            .dataset
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_code)
            .to_string();

        let pos = match datasets.iter().position(|d| d.code == code) {
            Some(pos) => pos,
            None => {
                datasets.push(LevelDataset::new(code.clone(), Vec::new()));
                datasets.len() - 1
            }
        };
        let ds = &mut datasets[pos];
        let id = LevelId::new(code, ds.levels.len());
        ds.levels.push(raw.into_level(id, gamma)?);
    }

    Ok(datasets)
}
