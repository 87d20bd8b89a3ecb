use serde::{Deserialize, Serialize};

use crate::math::{GeoPoint, Vec3};

/// Axis-aligned bounding boxes
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Lon/lat footprint of a set of geographic points.
    pub fn from_geo_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb2::new([first.lon, first.lat], [first.lon, first.lat]);
        for p in iter {
            out.min[0] = out.min[0].min(p.lon);
            out.min[1] = out.min[1].min(p.lat);
            out.max[0] = out.max[0].max(p.lon);
            out.max[1] = out.max[1].max(p.lat);
        }
        Some(out)
    }
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb3::new(
            [first.x, first.y, first.z],
            [first.x, first.y, first.z],
        );
        for p in iter {
            out.extend(p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: Vec3) {
        let c = [p.x, p.y, p.z];
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(c[axis]);
            self.max[axis] = self.max[axis].max(c[axis]);
        }
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}
