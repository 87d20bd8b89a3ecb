use crate::mesh::{
    ATTRIBUTE_DISTANCES, ATTRIBUTE_NORMALS, ATTRIBUTE_POSITIONS, ATTRIBUTE_TEX_COORDS, Geometry,
};

/// Attribute-buffer contract consumed by rendering hosts.
///
/// Host adapters depend on this trait only; they own any GPU resources and
/// decide when to upload.
pub trait RenderableMesh {
    /// xyz per vertex, meters relative to the track origin.
    fn positions(&self) -> &[f32];
    /// xyz per vertex, unit length.
    fn normals(&self) -> &[f32];
    /// uv per vertex.
    fn tex_coords(&self) -> &[f32];
    fn indices(&self) -> &[u32];

    fn vertex_count(&self) -> usize {
        self.positions().len() / 3
    }

    fn triangle_count(&self) -> usize {
        self.indices().len() / 3
    }
}

impl RenderableMesh for Geometry {
    fn positions(&self) -> &[f32] {
        self.values(ATTRIBUTE_POSITIONS)
    }

    fn normals(&self) -> &[f32] {
        self.values(ATTRIBUTE_NORMALS)
    }

    fn tex_coords(&self) -> &[f32] {
        self.values(ATTRIBUTE_TEX_COORDS)
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl Geometry {
    /// Cumulative arc length in meters per vertex.
    pub fn distances(&self) -> &[f32] {
        self.values(ATTRIBUTE_DISTANCES)
    }
}

#[cfg(test)]
mod tests {
    use super::RenderableMesh;
    use crate::extrude::extrude;
    use crate::mesh::assemble;
    use crate::polyline::Polyline;
    use crate::tangents::compute_normals;
    use foundation::math::PlanarPoint;

    fn counts(mesh: &dyn RenderableMesh) -> (usize, usize) {
        (mesh.vertex_count(), mesh.triangle_count())
    }

    #[test]
    fn geometry_exposes_buffers_through_trait() {
        let polyline = Polyline::new(vec![
            PlanarPoint::new(0.0, 0.0, 5.0),
            PlanarPoint::new(0.0, 10.0, 5.0),
            PlanarPoint::new(10.0, 10.0, 5.0),
        ])
        .expect("polyline");
        let normals = compute_normals(&polyline).expect("normals");
        let (side, top) = extrude(&polyline, &normals, 2.0).expect("extrude");
        let bundle = assemble(side, top);

        assert_eq!(counts(&bundle.side), (12, 16));
        assert_eq!(counts(&bundle.top), (6, 4));
        assert_eq!(bundle.top.normals().len(), 18);
        assert_eq!(bundle.top.tex_coords().len(), 12);
        assert_eq!(bundle.top.distances(), &[0.0, 0.0, 10.0, 10.0, 20.0, 20.0]);
    }
}
