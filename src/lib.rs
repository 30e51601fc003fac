//! Matching of nuclear levels reported by several datasets.
//!
//! Levels are loaded and normalized (`data`), compared pairwise on energy,
//! spin/parity and gamma-decay fingerprint (`physics`, `scoring`), and
//! grouped into one cluster per physical level (`cluster`).

pub mod cluster;
pub mod config;
pub mod data;
pub mod physics;
pub mod report;
pub mod scoring;
