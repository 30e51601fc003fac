//! Data layer: core types, loading, normalization and filtering.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Vec<RawLevel> (numbers kept as text)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  record   │  infer uncertainties, expand Jπ → Vec<LevelDataset>
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  energy window / dataset codes
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod record;
