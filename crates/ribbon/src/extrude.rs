//! Ribbon extrusion.
//!
//! Cross sections, per input vertex `i`:
//!
//! ```text
//!   side:  4i+0 top-left   4i+3 top-right        top:  2i+0 top-left
//!          4i+1 bottom-left 4i+2 bottom-right          2i+1 top-right
//! ```
//!
//! Left is `p - n * w/2`, right is `p + n * w/2`. Bottom vertices sit on the
//! sea-level baseline `z = 0`.

use foundation::math::{Vec2, Vec3, push_vec2_f32, push_vec3_f32};
use tracing::{debug, trace};

use crate::error::ExtrudeError;
use crate::polyline::{Polyline, VertexNormal};
use crate::tangents::{DegenerateNormal, compute_vertex_tangents_3d};

/// Elevation of the bottom edge of the side walls (meters).
pub const SEA_LEVEL: f64 = 0.0;

const MIN_TOP_NORMAL_LEN: f64 = 1e-6;
const MIN_TOTAL_LENGTH: f64 = 1e-6;

/// Flat vertex buffers of one triangle-list mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    /// xyz per vertex.
    pub positions: Vec<f32>,
    /// xyz per vertex.
    pub normals: Vec<f32>,
    /// uv per vertex.
    pub tex_coords: Vec<f32>,
    /// Cumulative arc length in meters per vertex.
    pub distances: Vec<f32>,
    /// Three indices per triangle.
    pub indices: Vec<u32>,
}

impl GeometryBuffers {
    fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices * 3),
            normals: Vec::with_capacity(vertices * 3),
            tex_coords: Vec::with_capacity(vertices * 2),
            distances: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3, tex: Vec2, distance: f64) {
        push_vec3_f32(&mut self.positions, position);
        push_vec3_f32(&mut self.normals, normal);
        push_vec2_f32(&mut self.tex_coords, tex);
        self.distances.push(distance as f32);
    }

    fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Vertical skirt from the path down to sea level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideGeometry(pub GeometryBuffers);

/// Flat riding surface at path elevation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopGeometry(pub GeometryBuffers);

/// Build side-wall and top-face meshes for `polyline`.
///
/// `normals` must hold one horizontal unit normal per vertex, as produced by
/// [`compute_normals`](crate::tangents::compute_normals).
pub fn extrude(
    polyline: &Polyline,
    normals: &[VertexNormal],
    width: f64,
) -> Result<(SideGeometry, TopGeometry), ExtrudeError> {
    if !(width.is_finite() && width > 0.0) {
        return Err(ExtrudeError::InvalidWidth { width });
    }
    let n = polyline.vertex_count();
    if normals.len() != n {
        return Err(ExtrudeError::NormalCountMismatch {
            vertices: n,
            normals: normals.len(),
        });
    }

    let tangents = compute_vertex_tangents_3d(polyline)?;
    let distances = polyline.cumulative_lengths();
    let total = distances[n - 1];
    let half_width = width / 2.0;

    let segments = n - 1;
    let mut side = GeometryBuffers::with_capacity(4 * n, 18 * segments + 12);
    let mut top = GeometryBuffers::with_capacity(2 * n, 6 * segments);

    for (i, point) in polyline.points().iter().enumerate() {
        let center = point.as_vec3();
        let normal = normals[i];
        let offset = normal.scale(half_width).extend(0.0);
        let top_left = center - offset;
        let top_right = center + offset;
        let bottom_left = Vec3::new(top_left.x, top_left.y, SEA_LEVEL);
        let bottom_right = Vec3::new(top_right.x, top_right.y, SEA_LEVEL);

        let v = if total > MIN_TOTAL_LENGTH {
            distances[i] / total
        } else {
            0.0
        };
        let d = distances[i];

        let wall_normal = normal.extend(0.0);
        side.push_vertex(top_left, wall_normal, Vec2::new(0.0, v), d);
        side.push_vertex(bottom_left, wall_normal, Vec2::new(0.0, v), d);
        side.push_vertex(bottom_right, wall_normal, Vec2::new(1.0, v), d);
        side.push_vertex(top_right, wall_normal, Vec2::new(1.0, v), d);

        let surface_normal = top_normal(tangents[i], normal, i).unwrap_or_else(|e| {
            trace!(vertex = e.vertex, "tangent parallel to offset, top normal points up");
            Vec3::UP
        });
        top.push_vertex(top_left, surface_normal, Vec2::new(0.0, v), d);
        top.push_vertex(top_right, surface_normal, Vec2::new(1.0, v), d);
    }

    for i in 0..segments as u32 {
        let this = i * 4;
        let next = this + 4;
        // left wall, floor, right wall
        side.push_quad(this, this + 1, next + 1, next);
        side.push_quad(this + 1, this + 2, next + 2, next + 1);
        side.push_quad(this + 2, this + 3, next + 3, next + 2);

        let this = i * 2;
        let next = this + 2;
        top.push_quad(this, next, next + 1, this + 1);
    }

    // End caps close the skirt; the start cap faces backwards.
    let last = segments as u32 * 4;
    side.push_quad(0, 3, 2, 1);
    side.push_quad(last, last + 1, last + 2, last + 3);

    debug!(
        vertices = n,
        side_triangles = side.indices.len() / 3,
        top_triangles = top.indices.len() / 3,
        length_m = total,
        "extruded ribbon"
    );

    Ok((SideGeometry(side), TopGeometry(top)))
}

/// Normalized `tangent × normal`; tilts with the along-track slope.
fn top_normal(
    tangent: Vec3,
    normal: VertexNormal,
    vertex: usize,
) -> Result<Vec3, DegenerateNormal> {
    tangent
        .cross(normal.extend(0.0))
        .try_normalize(MIN_TOP_NORMAL_LEN)
        .ok_or(DegenerateNormal { vertex })
}
