//! Precision policies.
//!
//! Geometry is computed in `f64` and narrowed to `f32` only when written into
//! render buffers. Planar coordinates are already origin-relative, so the
//! narrowing keeps about a centimeter of precision within 100 km of the
//! origin.

use super::{Vec2, Vec3};

/// Canonicalize a value before narrowing: `-0.0` becomes `0.0`.
///
/// Keeps buffers bit-identical regardless of the sign of zero produced by a
/// rotation or a subtraction.
#[inline]
pub fn canonical_f32(v: f64) -> f32 {
    let n = v as f32;
    if n == 0.0 { 0.0 } else { n }
}

/// Append a 3-component vector to a flat `f32` buffer.
#[inline]
pub fn push_vec3_f32(buf: &mut Vec<f32>, v: Vec3) {
    buf.extend_from_slice(&[canonical_f32(v.x), canonical_f32(v.y), canonical_f32(v.z)]);
}

/// Append a 2-component vector to a flat `f32` buffer.
#[inline]
pub fn push_vec2_f32(buf: &mut Vec<f32>, v: Vec2) {
    buf.extend_from_slice(&[canonical_f32(v.x), canonical_f32(v.y)]);
}
