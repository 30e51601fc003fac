//! Level-pair scoring.
//!
//! ```text
//!   Level × Level ──► features ──► LevelFeatures ──► model ──► probability
//!                                                           │
//!                         all cross-dataset pairs ──► matrix (ScoreMatrix)
//! ```

pub mod features;
pub mod matrix;
pub mod model;
