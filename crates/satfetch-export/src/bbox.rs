//! Geographic bounding boxes around a point.

use std::fmt;

/// Rectangular extent in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Square box extending `delta` degrees from the point in each direction.
    pub fn around(lat: f64, lon: f64, delta: f64) -> Self {
        Self {
            min_lon: lon - delta,
            min_lat: lat - delta,
            max_lon: lon + delta,
            max_lat: lat + delta,
        }
    }

    /// The `bbox` query value: `min_lon,min_lat,max_lon,max_lat`.
    pub fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoundingBox {
    // Shortest round-trip float formatting, so -74.0 - 0.002 prints as -74.002
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
