//! Core domain types and analytics.

pub mod analysis_config;
pub mod catalog;
pub mod comparison;
pub mod composite;
pub mod error;
pub mod frequency;
pub mod holding;
pub mod metrics;
pub mod nav;
pub mod resample;
pub mod resolver;
pub mod series;
pub mod table;
pub mod universe;
