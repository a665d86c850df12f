//! Error types for the export crate.

use thiserror::Error;

/// Errors that can occur when fetching an image from the export endpoint.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Network failure or timeout while talking to the endpoint.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server.
        status: u16,
        /// Full request URL, including the query string.
        url: String,
    },

    /// The response body could not be decoded as an image.
    #[error("Image decode error: {0}")]
    Decode(#[source] image::ImageError),

    /// Latitude or longitude is NaN or infinite.
    #[error("Invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// Export parameters are unusable (bad endpoint, zero size, ...).
    #[error("Invalid export parameters: {0}")]
    InvalidParams(String),
}
