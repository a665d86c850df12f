//! The fetch loop.
//!
//! Rows are processed strictly in order, one at a time:
//!
//! ```text
//! pending -> skip                       (image already on disk)
//!         -> fetch -> save -> done      (then sleep request_sleep)
//!         -> fetch/save failed -> logged, continue
//! ```
//!
//! A failing row never aborts the batch, and failed or skipped rows do not
//! sleep. There are no retries; a failed row is attempted again on the next
//! run because its image is still missing.

use crate::dataset::CoordinateRow;
use crate::output::{image_path, is_complete, save_png_atomic};
use crate::Result;
use indicatif::ProgressBar;
use satfetch_export::ImageSource;
use satfetch_metrics::{metric_defs, metrics};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// What happened to a row that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// The image already existed; nothing was fetched.
    Skipped,
    /// The image was fetched and written.
    Saved,
}

/// Totals for one pass over a set of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Rows handed to the driver.
    pub total: usize,
    /// Rows fetched and saved.
    pub fetched: usize,
    /// Rows skipped because their image existed.
    pub skipped: usize,
    /// Indices of rows whose fetch or save failed, in processing order.
    pub failed: Vec<usize>,
    /// Time spent in the rate-limit pause.
    pub slept: Duration,
    /// Wall-clock time of the whole pass.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Rows for which a fetch was attempted.
    pub fn attempted(&self) -> usize {
        self.fetched + self.failed.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} fetched, {} skipped, {} failed in {:.1}s ({:.1}s rate-limit sleep)",
            self.total,
            self.fetched,
            self.skipped,
            self.failed.len(),
            self.elapsed.as_secs_f64(),
            self.slept.as_secs_f64()
        )
    }
}

/// Drives one fetch-and-save attempt per row.
pub struct FetchDriver<S> {
    source: S,
    image_dir: PathBuf,
    request_sleep: Duration,
    progress: bool,
}

impl<S: ImageSource> FetchDriver<S> {
    /// Create a driver writing into `image_dir`, creating the directory if needed.
    pub fn new<P: Into<PathBuf>>(source: S, image_dir: P, request_sleep: Duration) -> Result<Self> {
        let image_dir = image_dir.into();
        fs::create_dir_all(&image_dir)?;

        Ok(Self {
            source,
            image_dir,
            request_sleep,
            progress: false,
        })
    }

    /// Show a progress bar on stderr while running.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// The image source used for fetching.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Directory receiving the images.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Pause applied after each fetched row.
    pub fn request_sleep(&self) -> Duration {
        self.request_sleep
    }

    /// Fetch and save a single row unless its image already exists.
    ///
    /// Does not sleep; pacing is the caller's concern.
    pub fn process_row(&self, row: &CoordinateRow) -> Result<RowOutcome> {
        let path = image_path(&self.image_dir, row.index);

        if is_complete(&self.image_dir, row.index) {
            trace!("Row {}: {} exists, skipping", row.index, path.display());
            return Ok(RowOutcome::Skipped);
        }

        let image = self.source.fetch_image(row.lat, row.lon)?;
        save_png_atomic(&image, &path)?;

        debug!(
            "Row {}: saved {}x{} image to {}",
            row.index,
            image.width(),
            image.height(),
            path.display()
        );
        Ok(RowOutcome::Saved)
    }

    /// Process every row in order, logging and continuing past failures.
    pub fn run(&self, rows: &[CoordinateRow]) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary {
            total: rows.len(),
            ..RunSummary::default()
        };

        let progress = if self.progress {
            ProgressBar::new(rows.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        for (done, row) in rows.iter().enumerate() {
            metrics::gauge!(metric_defs::ROWS_REMAINING.name).set((rows.len() - done) as f64);

            match self.process_row(row) {
                Ok(RowOutcome::Skipped) => {
                    summary.skipped += 1;
                    metrics::counter!(metric_defs::ROWS_SKIPPED.name).increment(1);
                }
                Ok(RowOutcome::Saved) => {
                    summary.fetched += 1;
                    metrics::counter!(metric_defs::ROWS_FETCHED.name).increment(1);

                    let slept = self.pause();
                    summary.slept += slept;
                    metrics::counter!(metric_defs::RATE_LIMIT_SLEEP.name)
                        .increment(slept.as_millis() as u64);
                }
                Err(e) => {
                    summary.failed.push(row.index);
                    metrics::counter!(metric_defs::ROWS_FAILED.name).increment(1);
                    progress.suspend(|| error!("Failed at index {}: {}", row.index, e));
                }
            }

            progress.inc(1);
        }

        metrics::gauge!(metric_defs::ROWS_REMAINING.name).set(0.0);
        progress.finish_and_clear();

        summary.elapsed = started.elapsed();
        summary
    }

    fn pause(&self) -> Duration {
        if self.request_sleep.is_zero() {
            return Duration::ZERO;
        }
        let started = Instant::now();
        thread::sleep(self.request_sleep);
        started.elapsed()
    }
}
