//! Metrics infrastructure for the satfetch imagery pipeline.
//!
//! This crate declares every metric the fetcher and the driver emit as a
//! structured [`Metric`] constant, so names are spelled in exactly one place.
//! It re-exports the `metrics` crate for convenience.
//!
//! # Example
//!
//! ```rust,ignore
//! use satfetch_metrics::{metric_defs, describe_metrics};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! metrics::counter!(metric_defs::ROWS_FETCHED.name).increment(1);
//! ```
//!
//! No recorder is installed by this crate. Without one, the `metrics` macros
//! are no-ops.

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Use the const constructors to declare metrics at compile time.
///
/// ```rust
/// use satfetch_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const IMAGES_SAVED: Metric = Metric::counter("satfetch.images_saved")
///     .with_description("Images written to disk")
///     .with_unit(Unit::Count);
///
/// assert_eq!(IMAGES_SAVED.name, "satfetch.images_saved");
/// assert_eq!(IMAGES_SAVED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "satfetch.export.requests").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Label carrying the HTTP status class.
    ///
    /// Values from [`status_class`](crate::status_class): "2xx", "3xx", "4xx",
    /// "5xx", "other". The fetcher sets "error" when no response arrived.
    pub const STATUS_LABELS: &[&str] = &["status"];

    // ========================================================================
    // Export endpoint (fetcher)
    // ========================================================================

    /// HTTP requests sent to the export endpoint.
    ///
    /// Labels: status
    pub const EXPORT_REQUESTS: Metric = Metric::counter("satfetch.export.requests")
        .with_description("Requests sent to the image export endpoint")
        .with_unit(Unit::Count)
        .with_labels(STATUS_LABELS);

    /// Response body size of successful export requests.
    pub const EXPORT_RESPONSE_BYTES: Metric = Metric::histogram("satfetch.export.response_bytes")
        .with_description("Size of image bytes returned by the export endpoint")
        .with_unit(Unit::Bytes);

    /// Time from sending the request until the body has been read.
    pub const EXPORT_LATENCY: Metric = Metric::histogram("satfetch.export.latency_ms")
        .with_description("Export request latency in milliseconds")
        .with_unit(Unit::Milliseconds);

    /// Responses that could not be decoded as an image.
    pub const EXPORT_DECODE_FAILURES: Metric = Metric::counter("satfetch.export.decode_failures")
        .with_description("Export responses that failed to decode as an image")
        .with_unit(Unit::Count);

    // ========================================================================
    // Driver
    // ========================================================================

    /// Rows whose image was fetched and saved.
    pub const ROWS_FETCHED: Metric = Metric::counter("satfetch.rows.fetched")
        .with_description("Rows fetched and saved during this run")
        .with_unit(Unit::Count);

    /// Rows skipped because their output file already existed.
    pub const ROWS_SKIPPED: Metric = Metric::counter("satfetch.rows.skipped")
        .with_description("Rows skipped because the output image already exists")
        .with_unit(Unit::Count);

    /// Rows whose fetch or save failed.
    pub const ROWS_FAILED: Metric = Metric::counter("satfetch.rows.failed")
        .with_description("Rows whose fetch or save failed")
        .with_unit(Unit::Count);

    /// Rows left to process in the current run.
    pub const ROWS_REMAINING: Metric = Metric::gauge("satfetch.rows.remaining")
        .with_description("Rows not yet processed in the current run")
        .with_unit(Unit::Count);

    /// Time spent in the rate-limit pause.
    pub const RATE_LIMIT_SLEEP: Metric = Metric::counter("satfetch.rate_limit.sleep_ms")
        .with_description("Total time spent sleeping between export requests")
        .with_unit(Unit::Milliseconds);

    /// Every metric defined above.
    pub const ALL: &[&Metric] = &[
        &EXPORT_REQUESTS,
        &EXPORT_RESPONSE_BYTES,
        &EXPORT_LATENCY,
        &EXPORT_DECODE_FAILURES,
        &ROWS_FETCHED,
        &ROWS_SKIPPED,
        &ROWS_FAILED,
        &ROWS_REMAINING,
        &RATE_LIMIT_SLEEP,
    ];
}

/// Maps an HTTP status code to the value of the `status` label.
pub fn status_class(code: u16) -> &'static str {
    match code {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Describes all metrics used by the pipeline.
///
/// Call once at startup, after a recorder has been installed.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
