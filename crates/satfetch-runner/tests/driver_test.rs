//! Integration tests for the fetch driver.
//!
//! Most tests use in-process image sources; the HTTP tests run the real
//! fetcher against a local mock export endpoint.

mod common;

use common::{png_files, sample_coords, MockExport};
use image::DynamicImage;
use satfetch_export::{EsriExportFetcher, ExportError, ExportParams, ImageSource};
use satfetch_runner::output::image_path;
use satfetch_runner::{Dataset, FetchDriver, RunMode};
use std::cell::RefCell;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Sources
// ============================================================================

/// Fails for the listed latitudes, returns a small image otherwise.
#[derive(Default)]
struct FlakySource {
    failing_lats: Vec<f64>,
    calls: RefCell<Vec<(f64, f64)>>,
}

impl FlakySource {
    fn failing(lats: &[f64]) -> Self {
        Self {
            failing_lats: lats.to_vec(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ImageSource for FlakySource {
    fn fetch_image(&self, lat: f64, lon: f64) -> satfetch_export::Result<DynamicImage> {
        self.calls.borrow_mut().push((lat, lon));
        if self.failing_lats.contains(&lat) {
            return Err(ExportError::HttpStatus {
                status: 500,
                url: format!("mock://export?lat={}&lon={}", lat, lon),
            });
        }
        Ok(DynamicImage::new_rgb8(16, 16))
    }
}

/// Fails for every coordinate.
struct BrokenSource;

impl ImageSource for BrokenSource {
    fn fetch_image(&self, lat: f64, lon: f64) -> satfetch_export::Result<DynamicImage> {
        Err(ExportError::InvalidCoordinate { lat, lon })
    }
}

fn http_fetcher(server: &MockExport) -> EsriExportFetcher {
    EsriExportFetcher::new(ExportParams {
        endpoint: server.endpoint(),
        ..ExportParams::default()
    })
    .expect("Failed to create fetcher")
}

// ============================================================================
// Skip / Failure Isolation
// ============================================================================

#[test]
fn test_existing_file_is_skipped_even_if_fetch_would_fail() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = Dataset::from_coordinates(sample_coords(3));
    fs::write(image_path(temp_dir.path(), 1), b"placeholder").unwrap();

    let driver = FetchDriver::new(BrokenSource, temp_dir.path(), Duration::ZERO).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.fetched, 0);
    assert_eq!(summary.failed, vec![0, 2], "Row 1 must never be attempted");

    // The existing file is left as-is, whatever it contains
    assert_eq!(fs::read(image_path(temp_dir.path(), 1)).unwrap(), b"placeholder");
}

#[test]
fn test_skipped_rows_make_no_fetch_calls() {
    let temp_dir = TempDir::new().unwrap();
    let coords = sample_coords(4);
    let dataset = Dataset::from_coordinates(coords.clone());
    for index in [0, 2] {
        fs::write(image_path(temp_dir.path(), index), b"done").unwrap();
    }

    let driver = FetchDriver::new(FlakySource::default(), temp_dir.path(), Duration::ZERO).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.fetched, 2);
    assert_eq!(
        driver.source().calls.borrow().as_slice(),
        &[coords[1], coords[3]]
    );
}

#[test]
fn test_failure_does_not_abort_batch() {
    let temp_dir = TempDir::new().unwrap();
    let coords = sample_coords(6);
    let dataset = Dataset::from_coordinates(coords.clone());

    // Row 2 fails
    let source = FlakySource::failing(&[coords[2].0]);
    let driver = FetchDriver::new(source, temp_dir.path(), Duration::ZERO).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!(summary.failed, vec![2]);
    assert_eq!(summary.fetched, 5);
    assert_eq!(driver.source().call_count(), 6, "Rows after the failure are still attempted");

    assert!(!image_path(temp_dir.path(), 2).exists());
    for index in [0, 1, 3, 4, 5] {
        assert!(image_path(temp_dir.path(), index).exists(), "Row {} missing", index);
    }
}

#[test]
fn test_failed_row_is_retried_on_next_run() {
    let temp_dir = TempDir::new().unwrap();
    let coords = sample_coords(3);
    let dataset = Dataset::from_coordinates(coords.clone());

    let first = FetchDriver::new(FlakySource::failing(&[coords[1].0]), temp_dir.path(), Duration::ZERO)
        .unwrap()
        .run(dataset.rows());
    assert_eq!(first.failed, vec![1]);

    let driver = FetchDriver::new(FlakySource::default(), temp_dir.path(), Duration::ZERO).unwrap();
    let second = driver.run(dataset.rows());
    assert_eq!(second.skipped, 2);
    assert_eq!(second.fetched, 1);
    assert_eq!(driver.source().calls.borrow().as_slice(), &[coords[1]]);
}

// ============================================================================
// Rate Limiting
// ============================================================================

#[test]
fn test_sleep_between_fetched_rows() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = Dataset::from_coordinates(sample_coords(4));
    let request_sleep = Duration::from_millis(50);

    let driver = FetchDriver::new(FlakySource::default(), temp_dir.path(), request_sleep).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!(summary.fetched, 4);
    assert!(
        summary.slept >= request_sleep * 3,
        "Slept {:?}, expected at least {:?}",
        summary.slept,
        request_sleep * 3
    );
    assert!(summary.elapsed >= summary.slept);
}

#[test]
fn test_skipped_and_failed_rows_do_not_sleep() {
    let temp_dir = TempDir::new().unwrap();
    let coords = sample_coords(3);
    let dataset = Dataset::from_coordinates(coords.clone());
    fs::write(image_path(temp_dir.path(), 0), b"done").unwrap();

    // Row 0 skipped, row 1 fails, row 2 fetched: exactly one pause
    let request_sleep = Duration::from_millis(300);
    let source = FlakySource::failing(&[coords[1].0]);
    let driver = FetchDriver::new(source, temp_dir.path(), request_sleep).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!((summary.skipped, summary.fetched, summary.failed.len()), (1, 1, 1));
    assert!(summary.slept >= request_sleep);
    assert!(summary.slept < request_sleep * 2, "Slept {:?}", summary.slept);
}

// ============================================================================
// HTTP
// ============================================================================

#[test]
fn test_end_to_end_single_row() {
    let server = MockExport::start();
    let temp_dir = TempDir::new().unwrap();
    let image_dir = temp_dir.path().join("images");
    let dataset = Dataset::from_coordinates([(40.0, -74.0)]);

    let driver = FetchDriver::new(http_fetcher(&server), &image_dir, Duration::ZERO).unwrap();
    let summary = driver.run(dataset.rows());
    assert_eq!(summary.fetched, 1);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["bbox"], "-74.002,39.998,-73.998,40.002");
    assert_eq!(requests[0]["size"], "224,224");
    assert_eq!(requests[0]["format"], "png");
    assert_eq!(requests[0]["f"], "image");

    let saved = image::open(image_dir.join("0.png")).expect("images/0.png should decode");
    assert_eq!((saved.width(), saved.height()), (224, 224));
    assert_eq!(png_files(&image_dir), vec!["0.png"]);
}

#[test]
fn test_second_run_makes_no_requests() {
    let server = MockExport::start();
    let temp_dir = TempDir::new().unwrap();
    let dataset = Dataset::from_coordinates(sample_coords(5));

    let driver = FetchDriver::new(http_fetcher(&server), temp_dir.path(), Duration::ZERO).unwrap();
    let first = driver.run(dataset.rows());
    assert_eq!(first.fetched, 5);
    assert_eq!(server.request_count(), 5);

    let second = driver.run(dataset.rows());
    assert_eq!(second.skipped, 5);
    assert_eq!(second.attempted(), 0);
    assert_eq!(server.request_count(), 5, "Second run must not hit the network");
}

#[test]
fn test_http_error_row_is_isolated() {
    let coords = sample_coords(4);
    let failing_bbox = ExportParams::default()
        .bbox_for(coords[1].0, coords[1].1)
        .to_query_value();
    let server = MockExport::start_failing(vec![failing_bbox]);
    let temp_dir = TempDir::new().unwrap();
    let dataset = Dataset::from_coordinates(coords);

    let driver = FetchDriver::new(http_fetcher(&server), temp_dir.path(), Duration::ZERO).unwrap();
    let summary = driver.run(dataset.rows());

    assert_eq!(summary.failed, vec![1]);
    assert_eq!(summary.fetched, 3);
    assert_eq!(server.request_count(), 4);
    assert_eq!(png_files(temp_dir.path()), vec!["0.png", "2.png", "3.png"]);
}

#[test]
fn test_demo_mode_touches_only_sample() {
    let server = MockExport::start();
    let temp_dir = TempDir::new().unwrap();
    let dataset = Dataset::from_coordinates(sample_coords(20));

    let driver = FetchDriver::new(http_fetcher(&server), temp_dir.path(), Duration::ZERO).unwrap();
    let summary = driver.run(dataset.select(RunMode::Demo { rows: 10 }));

    assert_eq!(summary.total, 10);
    assert_eq!(summary.fetched, 10);
    assert_eq!(server.request_count(), 10);

    let files = png_files(temp_dir.path());
    assert_eq!(files.len(), 10);
    for index in 0..10 {
        assert!(image_path(temp_dir.path(), index).exists());
    }
    for index in 10..20 {
        assert!(!image_path(temp_dir.path(), index).exists());
    }
}
