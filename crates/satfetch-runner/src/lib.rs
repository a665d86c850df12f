//! # satfetch-runner
//!
//! Batch driver for building a satellite image dataset from a table of
//! coordinates. For every row of the input it fetches one image from a
//! MapServer export endpoint and writes it to `<image_dir>/<row_index>.png`,
//! skipping rows whose image already exists.
//!
//! ```no_run
//! use satfetch_export::EsriExportFetcher;
//! use satfetch_runner::{Dataset, FetchConfig, FetchDriver};
//!
//! let config = FetchConfig::default();
//! let dataset = Dataset::from_path("train.xlsx", &config.lat_column, &config.lon_column)?;
//!
//! let fetcher = EsriExportFetcher::new(config.export_params()?)?;
//! let driver = FetchDriver::new(fetcher, &config.image_dir, config.request_sleep()?)?;
//!
//! let summary = driver.run(dataset.select(config.run_mode()));
//! println!("{}", summary);
//! # Ok::<(), satfetch_runner::RunnerError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod driver;
mod error;
pub mod output;

pub use config::FetchConfig;
pub use dataset::{CoordinateRow, Dataset, RunMode};
pub use driver::{FetchDriver, RowOutcome, RunSummary};
pub use error::RunnerError;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
