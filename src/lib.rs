//! navlens: fund and benchmark performance analytics.
//!
//! Resamples daily value series, synthesizes composite benchmarks, computes
//! mixed-frequency performance metrics, simulates rolling holding periods and
//! builds benchmark comparison tables.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
