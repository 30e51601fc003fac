//! Physics primitives shared by ingestion and scoring.
//!
//! * `uncertainty` – precision implied by how a number was written
//! * `spin_parity` – Jπ text → candidate quantum states
//! * `gamma`       – gamma-decay fingerprint similarity

pub mod gamma;
pub mod spin_parity;
pub mod uncertainty;
