//! Geographic bounding box used to restrict stations to the visible map area.

use serde::{Deserialize, Serialize};

/// An axis-aligned geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its four extents.
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// Build the envelope of a quadrilateral given as `[lon, lat]` corners.
    ///
    /// The map reports its visible area as four corners which are not
    /// necessarily axis aligned (the view may be rotated or pitched), so the
    /// extents are the min/max over every corner rather than a read of two
    /// specific corners.
    pub fn from_corners(corners: &[[f64; 2]]) -> Result<Self, BboxParseError> {
        if corners.is_empty() {
            return Err(BboxParseError::NoCorners);
        }

        let mut bbox = Self {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };

        for (i, [lon, lat]) in corners.iter().copied().enumerate() {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(BboxParseError::NonFiniteCorner(i));
            }
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
        }

        Ok(bbox)
    }

    /// Width of the bounding box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the bounding box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point lies inside the box. Edges are inclusive.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Bounding box needs at least one corner")]
    NoCorners,

    #[error("Corner {0} has a non-finite coordinate")]
    NonFiniteCorner(usize),
}
