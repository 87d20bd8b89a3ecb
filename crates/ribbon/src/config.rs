use foundation::math::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::error::ExtrudeError;

/// Extrusion settings shared by every track of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeConfig {
    /// Ribbon width in meters.
    pub width: f64,
    /// Projection origin; the track centroid when absent.
    #[serde(default)]
    pub origin: Option<GeoPoint>,
    /// Drop consecutive points that repeat, or project within a micron of,
    /// the previous point. Collinear points are kept.
    #[serde(default)]
    pub clean_coords: bool,
}

impl ExtrudeConfig {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            origin: None,
            clean_coords: false,
        }
    }

    pub fn with_origin(mut self, origin: GeoPoint) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_clean_coords(mut self, clean: bool) -> Self {
        self.clean_coords = clean;
        self
    }

    pub fn validate(&self) -> Result<(), ExtrudeError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(ExtrudeError::InvalidWidth { width: self.width });
        }
        Ok(())
    }
}
