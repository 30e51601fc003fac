use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Measurement – a value with a symmetric uncertainty
// ---------------------------------------------------------------------------

/// A measured quantity with its (always populated) symmetric uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }

    /// Statistical distance to `other`: |a − b| / sqrt(σa² + σb²).
    ///
    /// Two exactly equal values are at distance 0 even with zero combined
    /// uncertainty; unequal values with zero combined uncertainty are
    /// infinitely far apart.
    pub fn z_score(&self, other: &Measurement) -> f64 {
        let diff = (self.value - other.value).abs();
        let sigma = (self.uncertainty.powi(2) + other.uncertainty.powi(2)).sqrt();
        if diff == 0.0 {
            0.0
        } else if sigma > 0.0 {
            diff / sigma
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}±{}", self.value, self.uncertainty)
    }
}

// ---------------------------------------------------------------------------
// Spin / parity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parity {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

impl Parity {
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Parity::Positive),
            '-' => Some(Parity::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Positive => write!(f, "+"),
            Parity::Negative => write!(f, "-"),
        }
    }
}

/// One candidate quantum state of a level.
///
/// Spin is stored doubled so half-integer values stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpinParityState {
    pub two_times_spin: Option<u32>,
    pub parity: Option<Parity>,
    pub is_tentative_spin: bool,
    pub is_tentative_parity: bool,
}

impl SpinParityState {
    pub fn spin(&self) -> Option<f64> {
        self.two_times_spin.map(|j2| j2 as f64 / 2.0)
    }
}

// ---------------------------------------------------------------------------
// Gamma transitions
// ---------------------------------------------------------------------------

/// A gamma decay out of the owning level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaTransition {
    pub energy: Measurement,
    /// Relative intensity; value and uncertainty are present together or not at all.
    pub intensity: Option<Measurement>,
    /// Index of the final level within the same dataset, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_level: Option<usize>,
}

impl GammaTransition {
    pub fn new(energy: Measurement, intensity: Option<Measurement>) -> Self {
        Self {
            energy,
            intensity,
            final_level: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Identifies a level by dataset code and position within that dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId {
    pub dataset: String,
    pub index: usize,
}

impl LevelId {
    pub fn new(dataset: impl Into<String>, index: usize) -> Self {
        Self {
            dataset: dataset.into(),
            index,
        }
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dataset, self.index)
    }
}

/// A normalized level record, ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub energy: Measurement,
    /// The Jπ expression as reported, kept for display.
    pub spin_parity_text: String,
    /// Expanded candidate states (empty when unknown).
    pub spin_parity: Vec<SpinParityState>,
    pub gamma_decays: Vec<GammaTransition>,
}

impl Level {
    pub fn dataset_code(&self) -> &str {
        &self.id.dataset
    }
}

// ---------------------------------------------------------------------------
// LevelDataset – all levels reported by one dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDataset {
    pub code: String,
    pub levels: Vec<Level>,
}

impl LevelDataset {
    pub fn new(code: impl Into<String>, levels: Vec<Level>) -> Self {
        Self {
            code: code.into(),
            levels,
        }
    }

    /// Keep only the levels at `indices`; level ids are left untouched.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            code: self.code.clone(),
            levels: indices
                .iter()
                .filter_map(|&i| self.levels.get(i).cloned())
                .collect(),
        }
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
