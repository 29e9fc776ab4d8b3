//! # EEWS Visualization Suite
//!
//! Turns the cleaned results mapping into chart artifacts in the
//! visualization folder:
//! - Sample size overview
//! - Per-attribute histograms and donut charts
//! - Event-window charts
//! - Nested relationship sunbursts
//!
//! Plus a set of data sanity checks that are logged, not stored.

pub mod breakdown;
pub mod dataset;
pub mod diagnostics;
pub mod publish;
pub mod render;
pub mod suite;

pub use dataset::Dataset;
pub use diagnostics::{run_diagnostics, Finding};
pub use suite::{VisualizationReport, Visualizer};
