//! ArcGIS MapServer `export` fetcher.
//!
//! Requests a single rendered image for a small bounding box around a
//! coordinate. The default endpoint is ESRI World Imagery:
//!
//! `https://services.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/export`
//!
//! ## Request Parameters
//!
//! | param | value |
//! |---|---|
//! | `bbox` | `min_lon,min_lat,max_lon,max_lat` |
//! | `bboxSR` / `imageSR` | `4326` |
//! | `size` | `224,224` |
//! | `format` | `png` |
//! | `dpi` | `96` |
//! | `f` | `image` (raw image bytes instead of JSON) |
//!
//! One request per call. Nothing is retried and the decoded image is not
//! inspected.

use crate::{BoundingBox, ExportError, Result};
use image::DynamicImage;
use satfetch_metrics::{metric_defs, metrics, status_class};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// ESRI World Imagery export endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://services.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/export";

/// Default output width and height in pixels.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Default half-width of the bounding box in degrees. Smaller is more zoomed in.
pub const DEFAULT_ZOOM_DELTA: f64 = 0.002;

/// Default DPI sent to the export endpoint.
pub const DEFAULT_DPI: u32 = 96;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Spatial reference used for both the bbox and the output image.
pub const WGS84_WKID: u32 = 4326;

/// Parameters shared by every export request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportParams {
    /// Export endpoint URL.
    pub endpoint: String,
    /// Output width and height in pixels.
    pub image_size: u32,
    /// Bounding box half-width in degrees.
    pub zoom_delta: f64,
    /// DPI of the rendered image.
    pub dpi: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
            zoom_delta: DEFAULT_ZOOM_DELTA,
            dpi: DEFAULT_DPI,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExportParams {
    /// Check that the parameters can produce a meaningful request.
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.endpoint).map_err(|e| {
            ExportError::InvalidParams(format!("endpoint {:?}: {}", self.endpoint, e))
        })?;
        if self.image_size == 0 {
            return Err(ExportError::InvalidParams("image size must be > 0".into()));
        }
        if !self.zoom_delta.is_finite() || self.zoom_delta <= 0.0 {
            return Err(ExportError::InvalidParams(format!(
                "zoom delta must be a positive number, got {}",
                self.zoom_delta
            )));
        }
        if self.timeout.is_zero() {
            return Err(ExportError::InvalidParams("timeout must be > 0".into()));
        }
        Ok(())
    }

    /// Bounding box requested for a coordinate.
    pub fn bbox_for(&self, lat: f64, lon: f64) -> BoundingBox {
        BoundingBox::around(lat, lon, self.zoom_delta)
    }

    /// Query string pairs for a bounding box, in request order.
    pub fn query_pairs(&self, bbox: &BoundingBox) -> Vec<(&'static str, String)> {
        vec![
            ("bbox", bbox.to_query_value()),
            ("bboxSR", WGS84_WKID.to_string()),
            ("imageSR", WGS84_WKID.to_string()),
            ("size", format!("{},{}", self.image_size, self.image_size)),
            ("format", "png".to_string()),
            ("dpi", self.dpi.to_string()),
            ("f", "image".to_string()),
        ]
    }
}

/// Anything that can produce an image for a coordinate.
///
/// The driver only depends on this trait, so tests can substitute a source
/// that never touches the network.
pub trait ImageSource {
    /// Fetch and decode the image centered on `(lat, lon)`.
    fn fetch_image(&self, lat: f64, lon: f64) -> Result<DynamicImage>;
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
    fn fetch_image(&self, lat: f64, lon: f64) -> Result<DynamicImage> {
        (**self).fetch_image(lat, lon)
    }
}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn fetch_image(&self, lat: f64, lon: f64) -> Result<DynamicImage> {
        (**self).fetch_image(lat, lon)
    }
}

/// Download statistics for the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Requests sent this session, successful or not.
    pub requests_sent: usize,
    /// Images successfully decoded this session.
    pub images_fetched: usize,
    /// Total response bytes received with a success status.
    pub bytes_downloaded: u64,
}

/// Blocking fetcher for an ArcGIS MapServer export endpoint.
pub struct EsriExportFetcher {
    params: ExportParams,
    client: reqwest::blocking::Client,
    requests_sent: AtomicUsize,
    images_fetched: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for EsriExportFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsriExportFetcher")
            .field("params", &self.params)
            .finish()
    }
}

impl EsriExportFetcher {
    /// Create a fetcher for the given parameters.
    pub fn new(params: ExportParams) -> Result<Self> {
        params.validate()?;

        let client = reqwest::blocking::Client::builder()
            .timeout(params.timeout)
            .user_agent(concat!("satfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            params,
            client,
            requests_sent: AtomicUsize::new(0),
            images_fetched: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Create a fetcher for the ESRI World Imagery endpoint with default parameters.
    pub fn world_imagery() -> Result<Self> {
        Self::new(ExportParams::default())
    }

    /// Get the request parameters.
    pub fn params(&self) -> &ExportParams {
        &self.params
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            images_fetched: self.images_fetched.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.requests_sent.store(0, Ordering::Relaxed);
        self.images_fetched.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
    }

    /// Fetch the raw response body for a coordinate without decoding it.
    pub fn fetch_bytes(&self, lat: f64, lon: f64) -> Result<Vec<u8>> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ExportError::InvalidCoordinate { lat, lon });
        }

        let bbox = self.params.bbox_for(lat, lon);
        trace!("Export request for ({}, {}) bbox={}", lat, lon, bbox);

        let started = Instant::now();
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .get(&self.params.endpoint)
            .query(&self.params.query_pairs(&bbox))
            .send()
            .inspect_err(|_| {
                metrics::counter!(metric_defs::EXPORT_REQUESTS.name, "status" => "error")
                    .increment(1);
            })?;

        let status = response.status();
        metrics::counter!(metric_defs::EXPORT_REQUESTS.name, "status" => status_class(status.as_u16()))
            .increment(1);

        if !status.is_success() {
            return Err(ExportError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let bytes = response.bytes()?;
        let elapsed = started.elapsed();

        self.bytes_downloaded
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        metrics::histogram!(metric_defs::EXPORT_RESPONSE_BYTES.name).record(bytes.len() as f64);
        metrics::histogram!(metric_defs::EXPORT_LATENCY.name)
            .record(elapsed.as_secs_f64() * 1000.0);

        debug!(
            "Fetched {} bytes for ({}, {}) in {:.1}ms",
            bytes.len(),
            lat,
            lon,
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(bytes.to_vec())
    }
}

impl ImageSource for EsriExportFetcher {
    fn fetch_image(&self, lat: f64, lon: f64) -> Result<DynamicImage> {
        let bytes = self.fetch_bytes(lat, lon)?;
        let image = image::load_from_memory(&bytes).map_err(|e| {
            metrics::counter!(metric_defs::EXPORT_DECODE_FAILURES.name).increment(1);
            ExportError::Decode(e)
        })?;
        self.images_fetched.fetch_add(1, Ordering::Relaxed);
        Ok(image)
    }
}
