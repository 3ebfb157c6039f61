//! Converter configuration
//!
//! Defaults mirror the classification workflow: three conversions at a time
//! with a short pause between groups so decoded buffers can be released.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GameWavError, Result};

/// Default number of conversions running together in one group
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

/// Default pause between groups in milliseconds
pub const DEFAULT_INTER_BATCH_PAUSE_MS: u64 = 50;

/// Suffix appended to the source stem of every converted file
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_UE";

pub const DEFAULT_OUTPUT_EXTENSION: &str = "wav";

/// File name of the packaged category export
pub const DEFAULT_ARCHIVE_NAME: &str = "GameWav_Export.zip";

/// Settings shared by the scheduler, naming and export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum jobs in flight within one group
    pub concurrency_limit: usize,
    /// Delay after a group settles before the next one starts
    pub inter_batch_pause_ms: u64,
    pub output_suffix: String,
    pub output_extension: String,
    pub archive_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            inter_batch_pause_ms: DEFAULT_INTER_BATCH_PAUSE_MS,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl ConverterConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults. The result is validated
    /// before it is returned.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ConverterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the scheduler and exporter rely on
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(GameWavError::Config {
                reason: "concurrency_limit must be at least 1".to_string(),
            });
        }
        if self.archive_name.trim().is_empty() {
            return Err(GameWavError::Config {
                reason: "archive_name must not be empty".to_string(),
            });
        }
        if self.output_extension.trim().is_empty() {
            return Err(GameWavError::Config {
                reason: "output_extension must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn inter_batch_pause(&self) -> Duration {
        Duration::from_millis(self.inter_batch_pause_ms)
    }
}
