//! # satfetch-export
//!
//! Satellite imagery fetcher for ArcGIS MapServer `export` endpoints.
//!
//! Given a latitude/longitude, the fetcher builds a small square bounding box
//! around the point, asks the export endpoint to render it as a PNG, and
//! decodes the response into an [`image::DynamicImage`].
//!
//! ## Example
//!
//! ```no_run
//! use satfetch_export::{EsriExportFetcher, ExportParams, ImageSource};
//!
//! let fetcher = EsriExportFetcher::new(ExportParams::default())?;
//!
//! // Times Square, 224x224 pixels covering +/-0.002 degrees
//! let image = fetcher.fetch_image(40.758, -73.9855)?;
//! println!("{}x{}", image.width(), image.height());
//! # Ok::<(), satfetch_export::ExportError>(())
//! ```

mod bbox;
mod error;
mod export;

pub use bbox::BoundingBox;
pub use error::ExportError;
pub use export::{
    DownloadStats, EsriExportFetcher, ExportParams, ImageSource, DEFAULT_DPI, DEFAULT_ENDPOINT,
    DEFAULT_IMAGE_SIZE, DEFAULT_TIMEOUT, DEFAULT_ZOOM_DELTA, WGS84_WKID,
};

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
