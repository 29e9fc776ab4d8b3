//! Pipeline configuration
//!
//! All settings (project identifiers, bucket layout, model parameters,
//! retention thresholds) are fixed at deployment time. The compiled-in
//! defaults are the production deployment; an optional TOML bootstrap file
//! may override any subset of them. The resulting [`PipelineConfig`] is
//! immutable and passed by reference to each stage.
//!
//! # Settings Sources Priority
//!
//! 1. TOML configuration file (`~/.config/eews/eews.toml`, then `/etc/eews/eews.toml`)
//! 2. Built-in defaults (code constants)

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR_NAME: &str = "eews";
const CONFIG_FILE_NAME: &str = "eews.toml";

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub gcp: GcpSettings,
    pub storage: StorageLayout,
    pub model: ModelSettings,
    pub retention: RetentionPolicy,
    pub logging: LoggingConfig,
}

/// Google Cloud project settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpSettings {
    pub project_id: String,
    /// Vertex AI region
    pub location: String,
}

impl Default for GcpSettings {
    fn default() -> Self {
        Self {
            project_id: "analyzing-eews".to_string(),
            location: "us-central1".to_string(),
        }
    }
}

/// Bucket-relative object layout shared by all stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLayout {
    pub bucket: String,
    /// Source image folders, searched in this order
    pub input_prefixes: [String; 2],
    /// Folder holding the results file and its backup
    pub output_prefix: String,
    /// Destination for images whose records were removed by cleaning
    pub deleted_prefix: String,
    /// Destination for rendered charts
    pub visualization_prefix: String,
    pub results_filename: String,
    pub backup_filename: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            bucket: "turkey_tweets_0".to_string(),
            input_prefixes: ["INPUTS_1".to_string(), "INPUTS_2".to_string()],
            output_prefix: "OUTPUTS_1".to_string(),
            deleted_prefix: "DELETED_FILES".to_string(),
            visualization_prefix: "VISUALIZATIONS_3".to_string(),
            results_filename: "test_results.json".to_string(),
            backup_filename: "test_results_original_backup.json".to_string(),
        }
    }
}

impl StorageLayout {
    /// Path of the results mapping (`OUTPUTS_1/test_results.json`)
    pub fn results_path(&self) -> String {
        join_path(&self.output_prefix, &self.results_filename)
    }

    /// Path the previous results file is archived to before cleaning rewrites it
    pub fn backup_path(&self) -> String {
        join_path(&self.output_prefix, &self.backup_filename)
    }

    /// Candidate locations of a source image, in lookup order
    pub fn input_paths(&self, filename: &str) -> [String; 2] {
        [
            join_path(&self.input_prefixes[0], filename),
            join_path(&self.input_prefixes[1], filename),
        ]
    }

    /// Listing prefixes for source images (trailing slash so `INPUTS_1` does not match `INPUTS_10`)
    pub fn input_listing_prefixes(&self) -> [String; 2] {
        [
            format!("{}/", self.input_prefixes[0].trim_end_matches('/')),
            format!("{}/", self.input_prefixes[1].trim_end_matches('/')),
        ]
    }

    pub fn deleted_path(&self, filename: &str) -> String {
        join_path(&self.deleted_prefix, filename)
    }

    pub fn visualization_path(&self, filename: &str) -> String {
        join_path(&self.visualization_prefix, filename)
    }
}

/// Generative model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model_name: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Fixed pause after every model call
    pub request_delay_ms: u64,
    /// Bucket-relative paths of the two exemplar screenshots
    pub exemplar_images: [String; 2],
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_name: "gemini-2.0-flash-001".to_string(),
            max_output_tokens: 8192,
            temperature: 0.2,
            top_p: 0.95,
            request_delay_ms: 1000,
            exemplar_images: [
                "EXAMPLES/Screenshot 2025-04-24 at 9.58.23 PM.png".to_string(),
                "EXAMPLES/Screenshot 2025-05-01 at 1.29.14 PM.png".to_string(),
            ],
        }
    }
}

/// Inclusion criteria applied by the cleaner
///
/// A record is kept iff its magnitude lies in
/// `(min_magnitude_exclusive, max_magnitude_inclusive]` and both its post and
/// alert timestamps lie in `[window_start, window_end)`.
///
/// Datetimes are written as quoted strings in TOML (`"2025-04-01T00:00:00"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub min_magnitude_exclusive: f64,
    pub max_magnitude_inclusive: f64,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            min_magnitude_exclusive: 4.5,
            max_magnitude_inclusive: 6.2,
            window_start: midnight(2025, 4, 1),
            window_end: midnight(2025, 6, 1),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration: TOML bootstrap file if one exists, else built-in defaults
    pub fn load() -> Result<Self> {
        match locate_config_file() {
            Some(path) => Self::from_toml_file(&path),
            None => {
                debug!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from an explicit TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let r = &self.retention;
        if r.min_magnitude_exclusive >= r.max_magnitude_inclusive {
            return Err(Error::Config(format!(
                "Magnitude bounds are empty: ({}, {}]",
                r.min_magnitude_exclusive, r.max_magnitude_inclusive
            )));
        }
        if r.window_start >= r.window_end {
            return Err(Error::Config(format!(
                "Date window is empty: [{}, {})",
                r.window_start, r.window_end
            )));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(Error::Config("Bucket name is empty".to_string()));
        }
        Ok(())
    }
}

/// Join bucket-relative path components with a single `/`
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Base name of a bucket-relative object path
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Find the bootstrap TOML file for the platform
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}
