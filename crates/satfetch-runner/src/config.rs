//! Run configuration.
//!
//! A [`FetchConfig`] is built from defaults, optionally overlaid by a YAML file
//! and then by command-line flags. Every key is optional in the file:
//!
//! ```yaml
//! image_dir: data_final/images_final
//! image_size: 224
//! zoom_delta: 0.002
//! request_sleep_secs: 0.2
//! request_timeout_secs: 10
//! demo_mode: false
//! ```

use crate::dataset::RunMode;
use crate::{Result, RunnerError};
use satfetch_export::{
    ExportParams, DEFAULT_DPI, DEFAULT_ENDPOINT, DEFAULT_IMAGE_SIZE, DEFAULT_ZOOM_DELTA,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output directory.
pub const DEFAULT_IMAGE_DIR: &str = "data_final/images_final";

/// Default pause after each fetched row, in seconds.
pub const DEFAULT_REQUEST_SLEEP_SECS: f64 = 0.2;

/// Default HTTP timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 10.0;

/// Default number of rows processed in demo mode.
pub const DEFAULT_DEMO_ROWS: usize = 10;

/// All recognized run options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Directory receiving `<row_index>.png` files.
    pub image_dir: PathBuf,
    /// Output image width and height in pixels.
    pub image_size: u32,
    /// Bounding box half-width in degrees.
    pub zoom_delta: f64,
    /// Pause after each fetched row.
    pub request_sleep_secs: f64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: f64,
    /// DPI sent to the export endpoint.
    pub dpi: u32,
    /// Export endpoint URL.
    pub endpoint: String,
    /// Only process the first `demo_rows` rows.
    pub demo_mode: bool,
    /// Sample size used in demo mode.
    pub demo_rows: usize,
    /// Header of the latitude column.
    pub lat_column: String,
    /// Header of the longitude column.
    pub lon_column: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            image_size: DEFAULT_IMAGE_SIZE,
            zoom_delta: DEFAULT_ZOOM_DELTA,
            request_sleep_secs: DEFAULT_REQUEST_SLEEP_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            dpi: DEFAULT_DPI,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            demo_mode: true,
            demo_rows: DEFAULT_DEMO_ROWS,
            lat_column: "lat".to_string(),
            lon_column: "long".to_string(),
        }
    }
}

impl FetchConfig {
    /// Parse a configuration from YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 {
            return Err(RunnerError::Config("image_size must be > 0".into()));
        }
        if !self.zoom_delta.is_finite() || self.zoom_delta <= 0.0 {
            return Err(RunnerError::Config(format!(
                "zoom_delta must be a positive number, got {}",
                self.zoom_delta
            )));
        }
        self.request_sleep()?;
        if self.export_params()?.timeout.is_zero() {
            return Err(RunnerError::Config(format!(
                "request_timeout_secs must be > 0, got {}",
                self.request_timeout_secs
            )));
        }
        if self.demo_mode && self.demo_rows == 0 {
            return Err(RunnerError::Config("demo_rows must be > 0".into()));
        }
        if self.lat_column.is_empty() || self.lon_column.is_empty() {
            return Err(RunnerError::Config("column names must not be empty".into()));
        }
        Ok(())
    }

    /// Pause after each fetched row.
    pub fn request_sleep(&self) -> Result<Duration> {
        seconds("request_sleep_secs", self.request_sleep_secs)
    }

    /// Which slice of the input to process.
    pub fn run_mode(&self) -> RunMode {
        if self.demo_mode {
            RunMode::Demo {
                rows: self.demo_rows,
            }
        } else {
            RunMode::Full
        }
    }

    /// Export request parameters for the fetcher.
    pub fn export_params(&self) -> Result<ExportParams> {
        Ok(ExportParams {
            endpoint: self.endpoint.clone(),
            image_size: self.image_size,
            zoom_delta: self.zoom_delta,
            dpi: self.dpi,
            timeout: seconds("request_timeout_secs", self.request_timeout_secs)?,
        })
    }
}

/// Convert a seconds value from the config into a `Duration`.
///
/// Negative, non-finite and out-of-range values are configuration errors.
fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        RunnerError::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            key, value
        ))
    })
}
