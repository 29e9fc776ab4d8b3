//! # EEWS Dataset Cleaner
//!
//! Applies the retention policy to the results mapping:
//! - Removed records have their screenshots moved to the deleted folder
//! - The original results file is archived as a backup
//! - The retained records overwrite the results file

pub mod cleaner;
pub mod relocate;
pub mod retention;

pub use cleaner::{CleanReport, Cleaner};
pub use retention::{evaluate, RemovalReason, RetentionDecision};
