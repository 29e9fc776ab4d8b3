//! # EEWS Common Library
//!
//! Shared code for the three pipeline stages (extract, clean, visualize):
//! - Pipeline configuration and bucket layout
//! - Annotation record model and results file (de)serialization
//! - Object storage access (Google Cloud Storage + in-memory store)
//! - Per-unit outcome reporting
//! - Logging initialization

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod record;
pub mod results;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use outcome::{FailureKind, UnitFailure};
pub use record::{AnnotationRecord, FieldValue, ResultsMapping};
pub use storage::{ObjectStore, StorageError};
