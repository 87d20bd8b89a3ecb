use foundation::math::{GeoPoint, LocalFrame, PlanarPoint, Vec2, Vec3};

use crate::error::ExtrudeError;
use crate::tangents::MIN_SEGMENT_LEN;

/// Unit direction of one segment in the horizontal plane.
pub type SegmentTangent = Vec2;

/// Unit horizontal offset direction at one vertex.
pub type VertexNormal = Vec2;

/// Ordered planar path with at least two vertices.
///
/// Vertex order is the direction of travel; it fixes tangent orientation and
/// the progression of the `v` texture coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<PlanarPoint>,
}

impl Polyline {
    pub fn new(points: Vec<PlanarPoint>) -> Result<Self, ExtrudeError> {
        if points.len() < 2 {
            return Err(ExtrudeError::InvalidPolyline { len: points.len() });
        }
        Ok(Self { points })
    }

    /// Project geographic points into `frame`.
    pub fn from_geo(points: &[GeoPoint], frame: &LocalFrame) -> Result<Self, ExtrudeError> {
        Self::new(points.iter().map(|p| frame.project(*p)).collect())
    }

    pub fn points(&self) -> &[PlanarPoint] {
        &self.points
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// 3D vector from vertex `i` to vertex `i + 1`.
    pub fn segment(&self, i: usize) -> Vec3 {
        self.points[i + 1].as_vec3() - self.points[i].as_vec3()
    }

    /// Drop vertices closer than [`MIN_SEGMENT_LEN`] to the previous kept
    /// vertex in the horizontal plane.
    ///
    /// The first vertex of a cluster wins. Collinear vertices are kept.
    pub fn merge_close_points(self) -> Result<Self, ExtrudeError> {
        let mut kept: Vec<PlanarPoint> = Vec::with_capacity(self.points.len());
        for p in self.points {
            if let Some(last) = kept.last() {
                if (p.as_vec3() - last.as_vec3()).xy().length() < MIN_SEGMENT_LEN {
                    continue;
                }
            }
            kept.push(p);
        }
        Self::new(kept)
    }

    /// Cumulative 3D arc length at every vertex (starts at 0).
    pub fn cumulative_lengths(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.points.len());
        let mut total = 0.0;
        out.push(total);
        for i in 0..self.segment_count() {
            total += self.segment(i).length();
            out.push(total);
        }
        out
    }
}

/// Drop points that repeat the previous point's position.
///
/// Only exact lon/lat repeats are removed; the first occurrence wins, so its
/// elevation is kept. Near repeats are merged after projection by
/// [`Polyline::merge_close_points`].
pub fn clean_coords(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut out: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if let Some(last) = out.last() {
            if last.lon == p.lon && last.lat == p.lat {
                continue;
            }
        }
        out.push(*p);
    }
    out
}
