//! Per-segment tangents and per-vertex bevel normals.
//!
//! Joins are bevelled: an interior normal is the normalized sum of the two
//! adjacent segment normals, never stretched to a true miter point. The
//! offset edge therefore stays within `width / 2` of the centerline at every
//! vertex, even at hairpins.

use foundation::math::{Vec2, Vec3};
use tracing::trace;

use crate::error::ExtrudeError;
use crate::polyline::{Polyline, SegmentTangent, VertexNormal};

/// Segments shorter than this in the horizontal plane have no direction (meters).
pub const MIN_SEGMENT_LEN: f64 = 1e-6;

/// Length of the summed segment normals below which a vertex counts as a
/// fold-back.
///
/// For unit normals the sum has length `2 cos(turn / 2)`; this value is
/// `2 cos(80°)`, so every turn sharper than 160° takes the fallback.
pub const FOLD_BACK_MITER_LEN: f64 = 0.347_296_355_333_860_7;

const MIN_TANGENT_SUM: f64 = 1e-6;

/// A direction that could not be normalized at `vertex`.
///
/// Never leaves this crate; callers substitute a fallback vector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct DegenerateNormal {
    pub vertex: usize,
}

/// Unit XY direction of every segment (`n - 1` entries).
pub fn compute_tangents(polyline: &Polyline) -> Result<Vec<SegmentTangent>, ExtrudeError> {
    (0..polyline.segment_count())
        .map(|i| {
            polyline
                .segment(i)
                .xy()
                .try_normalize(MIN_SEGMENT_LEN)
                .ok_or(ExtrudeError::DegenerateSegment { index: i + 1 })
        })
        .collect()
}

/// Horizontal offset direction at every vertex (`n` entries).
pub fn compute_normals(polyline: &Polyline) -> Result<Vec<VertexNormal>, ExtrudeError> {
    let tangents = compute_tangents(polyline)?;
    Ok(normals_from_tangents(&tangents))
}

/// Vertex normals from segment tangents; `tangents` must not be empty.
pub fn normals_from_tangents(tangents: &[SegmentTangent]) -> Vec<VertexNormal> {
    let Some((first, last)) = tangents.first().zip(tangents.last()) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(tangents.len() + 1);
    out.push(first.perp());
    for (i, pair) in tangents.windows(2).enumerate() {
        let prev = pair[0].perp();
        let normal = bevel_normal(prev, pair[1].perp(), i + 1).unwrap_or_else(|e| {
            trace!(vertex = e.vertex, "fold-back join, using incoming segment normal");
            prev
        });
        out.push(normal);
    }
    out.push(last.perp());
    out
}

fn bevel_normal(prev: Vec2, next: Vec2, vertex: usize) -> Result<Vec2, DegenerateNormal> {
    (prev + next)
        .try_normalize(FOLD_BACK_MITER_LEN)
        .ok_or(DegenerateNormal { vertex })
}

/// Unit 3D direction of travel at every vertex.
///
/// Endpoints take the adjacent segment; interior vertices average the two
/// adjacent segment directions, keeping the incoming direction when they
/// cancel out.
pub fn compute_vertex_tangents_3d(polyline: &Polyline) -> Result<Vec<Vec3>, ExtrudeError> {
    let segments = (0..polyline.segment_count())
        .map(|i| {
            let segment = polyline.segment(i);
            if segment.xy().length() < MIN_SEGMENT_LEN {
                return Err(ExtrudeError::DegenerateSegment { index: i + 1 });
            }
            segment
                .try_normalize(MIN_SEGMENT_LEN)
                .ok_or(ExtrudeError::DegenerateSegment { index: i + 1 })
        })
        .collect::<Result<Vec<Vec3>, _>>()?;

    let mut out = Vec::with_capacity(polyline.vertex_count());
    out.push(segments[0]);
    for (i, pair) in segments.windows(2).enumerate() {
        let avg = (pair[0] + pair[1]).try_normalize(MIN_TANGENT_SUM);
        out.push(avg.unwrap_or_else(|| {
            trace!(vertex = i + 1, "opposing segment directions, keeping incoming tangent");
            pair[0]
        }));
    }
    out.push(segments[segments.len() - 1]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{
        FOLD_BACK_MITER_LEN, compute_normals, compute_tangents, compute_vertex_tangents_3d,
    };
    use crate::error::ExtrudeError;
    use crate::polyline::Polyline;
    use foundation::math::{PlanarPoint, Vec2};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn line(points: &[[f64; 3]]) -> Polyline {
        Polyline::new(
            points
                .iter()
                .map(|p| PlanarPoint::new(p[0], p[1], p[2]))
                .collect(),
        )
        .expect("polyline")
    }

    #[test]
    fn fold_back_threshold_matches_160_degrees() {
        let expected = 2.0 * 80f64.to_radians().cos();
        assert_close(FOLD_BACK_MITER_LEN, expected, 1e-15);
    }

    #[test]
    fn tangents_ignore_elevation() {
        let t = compute_tangents(&line(&[[0.0, 0.0, 0.0], [3.0, 4.0, 100.0]])).expect("tangents");
        assert_eq!(t, vec![Vec2::new(0.6, 0.8)]);
    }

    #[test]
    fn coincident_points_are_a_hard_error() {
        let err = compute_tangents(&line(&[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]]))
            .expect_err("degenerate");
        assert_eq!(err, ExtrudeError::DegenerateSegment { index: 1 });

        // Same position, different elevation: still no horizontal direction.
        let err = compute_normals(&line(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [5.0, 0.0, 9.0]]))
            .expect_err("degenerate");
        assert_eq!(err, ExtrudeError::DegenerateSegment { index: 2 });
    }

    #[test]
    fn endpoint_normals_are_left_perpendiculars() {
        let normals = compute_normals(&line(&[[0.0, 0.0, 0.0], [0.0, 10.0, 0.0]])).expect("normals");
        assert_eq!(normals, vec![Vec2::new(-1.0, 0.0), Vec2::new(-1.0, 0.0)]);
    }

    #[test]
    fn right_angle_turn_bisects() {
        let normals = compute_normals(&line(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0]]))
            .expect("normals");
        assert_eq!(normals.len(), 3);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_close(normals[1].x, -h, 1e-12);
        assert_close(normals[1].y, h, 1e-12);
    }

    #[test]
    fn sharp_turn_falls_back_to_incoming_normal() {
        let turn = 170f64.to_radians();
        let p2 = [10.0 + 10.0 * turn.cos(), 10.0 * turn.sin(), 0.0];
        let normals = compute_normals(&line(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], p2]))
            .expect("normals");

        let n = normals[1];
        assert!(n.x.is_finite() && n.y.is_finite());
        assert_close(n.length(), 1.0, 1e-12);
        assert_eq!(n, Vec2::new(-0.0, 1.0));
    }

    #[test]
    fn full_reversal_stays_finite() {
        let normals = compute_normals(&line(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 0.0, 0.0]]))
            .expect("normals");
        for n in normals {
            assert_close(n.length(), 1.0, 1e-12);
        }
    }

    #[test]
    fn tangents_3d_follow_slope() {
        let t = compute_vertex_tangents_3d(&line(&[[0.0, 0.0, 0.0], [10.0, 0.0, 10.0]]))
            .expect("tangents");
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_close(t[0].x, h, 1e-12);
        assert_close(t[0].z, h, 1e-12);
        assert_eq!(t[0], t[1]);
    }

    #[test]
    fn tangents_3d_reversal_keeps_incoming() {
        let t = compute_vertex_tangents_3d(&line(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 0.0, 0.0]]))
            .expect("tangents");
        assert_eq!(t[1].x, 1.0);
    }
}
