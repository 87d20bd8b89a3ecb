use std::collections::BTreeMap;

use foundation::Aabb3;
use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::extrude::{GeometryBuffers, SideGeometry, TopGeometry};

pub const ATTRIBUTE_POSITIONS: &str = "positions";
pub const ATTRIBUTE_NORMALS: &str = "normals";
pub const ATTRIBUTE_TEX_COORDS: &str = "texCoords";
pub const ATTRIBUTE_DISTANCES: &str = "distances";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    TriangleList,
}

/// One named vertex attribute: `size` floats per vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub size: usize,
    pub value: Vec<f32>,
}

impl Attribute {
    pub fn new(size: usize, value: Vec<f32>) -> Self {
        Self { size, value }
    }
}

/// Attribute-buffer record handed to a rendering host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub topology: Topology,
    pub attributes: BTreeMap<String, Attribute>,
    pub indices: Vec<u32>,
}

/// Side and top meshes of one ribbon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBundle {
    pub side: Geometry,
    pub top: Geometry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    MissingAttribute {
        name: String,
    },
    AttributeLength {
        name: String,
        len: usize,
        expected: usize,
    },
    IncompleteTriangle {
        len: usize,
    },
    IndexOutOfBounds {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::MissingAttribute { name } => write!(f, "missing attribute {name}"),
            MeshError::AttributeLength {
                name,
                len,
                expected,
            } => write!(f, "attribute {name} has {len} values, expected {expected}"),
            MeshError::IncompleteTriangle { len } => {
                write!(f, "index count {len} is not a multiple of 3")
            }
            MeshError::IndexOutOfBounds {
                position,
                index,
                vertex_count,
            } => write!(
                f,
                "index {index} at position {position} exceeds vertex count {vertex_count}"
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// Package raw extruder output into named attribute records.
pub fn assemble(side: SideGeometry, top: TopGeometry) -> MeshBundle {
    MeshBundle {
        side: Geometry::from_buffers(side.0),
        top: Geometry::from_buffers(top.0),
    }
}

impl Geometry {
    pub fn from_buffers(buffers: GeometryBuffers) -> Self {
        let GeometryBuffers {
            positions,
            normals,
            tex_coords,
            distances,
            indices,
        } = buffers;

        let mut attributes = BTreeMap::new();
        attributes.insert(ATTRIBUTE_POSITIONS.to_string(), Attribute::new(3, positions));
        attributes.insert(ATTRIBUTE_NORMALS.to_string(), Attribute::new(3, normals));
        attributes.insert(ATTRIBUTE_TEX_COORDS.to_string(), Attribute::new(2, tex_coords));
        attributes.insert(ATTRIBUTE_DISTANCES.to_string(), Attribute::new(1, distances));

        Self {
            topology: Topology::TriangleList,
            attributes,
            indices,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Values of attribute `name`, empty when absent.
    pub fn values(&self, name: &str) -> &[f32] {
        self.attribute(name).map(|a| a.value.as_slice()).unwrap_or(&[])
    }

    pub fn vertex_count(&self) -> usize {
        self.values(ATTRIBUTE_POSITIONS).len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Bounding box of the positions in local meters.
    pub fn bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(self.values(ATTRIBUTE_POSITIONS).chunks_exact(3).map(|p| {
            Vec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]))
        }))
    }

    /// Check attribute strides against the vertex count and index bounds.
    pub fn validate(&self) -> Result<(), MeshError> {
        let positions = self
            .attribute(ATTRIBUTE_POSITIONS)
            .ok_or_else(|| MeshError::MissingAttribute {
                name: ATTRIBUTE_POSITIONS.to_string(),
            })?;
        let vertex_count = positions.value.len() / positions.size.max(1);

        for (name, attr) in &self.attributes {
            let expected = vertex_count * attr.size;
            if attr.value.len() != expected {
                return Err(MeshError::AttributeLength {
                    name: name.clone(),
                    len: attr.value.len(),
                    expected,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle {
                len: self.indices.len(),
            });
        }

        for (position, &index) in self.indices.iter().enumerate() {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfBounds {
                    position,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

impl MeshBundle {
    pub fn validate(&self) -> Result<(), MeshError> {
        self.side.validate()?;
        self.top.validate()
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        match (self.side.bounds(), self.top.bounds()) {
            (Some(mut a), Some(b)) => {
                a.extend(Vec3::new(b.min[0], b.min[1], b.min[2]));
                a.extend(Vec3::new(b.max[0], b.max[1], b.max[2]));
                Some(a)
            }
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ATTRIBUTE_NORMALS, ATTRIBUTE_POSITIONS, ATTRIBUTE_TEX_COORDS, Geometry, MeshError,
        Topology, assemble,
    };
    use crate::extrude::{GeometryBuffers, SideGeometry, TopGeometry, extrude};
    use crate::polyline::Polyline;
    use crate::tangents::compute_normals;
    use foundation::math::PlanarPoint;
    use pretty_assertions::assert_eq;

    fn triangle() -> GeometryBuffers {
        GeometryBuffers {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 2.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            tex_coords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            distances: vec![0.0, 1.0, 1.0],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn assemble_names_attributes() {
        let bundle = assemble(SideGeometry(triangle()), TopGeometry(triangle()));
        assert_eq!(bundle.side.topology, Topology::TriangleList);
        assert_eq!(bundle.side.attribute(ATTRIBUTE_POSITIONS).map(|a| a.size), Some(3));
        assert_eq!(bundle.side.attribute(ATTRIBUTE_NORMALS).map(|a| a.size), Some(3));
        assert_eq!(bundle.side.attribute(ATTRIBUTE_TEX_COORDS).map(|a| a.size), Some(2));
        assert_eq!(bundle.top.vertex_count(), 3);
        assert_eq!(bundle.top.triangle_count(), 1);
        assert_eq!(bundle.validate(), Ok(()));
    }

    #[test]
    fn assembled_extrusion_validates() {
        let polyline = Polyline::new(vec![
            PlanarPoint::new(0.0, 0.0, 12.0),
            PlanarPoint::new(8.0, 3.0, 14.0),
            PlanarPoint::new(9.0, 12.0, 13.0),
        ])
        .expect("polyline");
        let normals = compute_normals(&polyline).expect("normals");
        let (side, top) = extrude(&polyline, &normals, 4.0).expect("extrude");
        let bundle = assemble(side, top);
        assert_eq!(bundle.validate(), Ok(()));
        assert_eq!(bundle.side.vertex_count(), 12);
        assert_eq!(bundle.top.vertex_count(), 6);

        let bounds = bundle.bounds().expect("bounds");
        assert_eq!(bounds.min[2], 0.0);
        assert_eq!(bounds.max[2], 14.0);
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let mut buffers = triangle();
        buffers.indices = vec![0, 1, 3];
        let geometry = Geometry::from_buffers(buffers);
        assert_eq!(
            geometry.validate(),
            Err(MeshError::IndexOutOfBounds {
                position: 2,
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn rejects_short_attribute() {
        let mut buffers = triangle();
        buffers.tex_coords.pop();
        let geometry = Geometry::from_buffers(buffers);
        assert_eq!(
            geometry.validate(),
            Err(MeshError::AttributeLength {
                name: ATTRIBUTE_TEX_COORDS.to_string(),
                len: 5,
                expected: 6
            })
        );
    }

    #[test]
    fn serializes_with_host_attribute_names() {
        let geometry = Geometry::from_buffers(triangle());
        let json = serde_json::to_value(&geometry).expect("serialize");
        assert_eq!(json["topology"], "triangle-list");
        assert_eq!(json["attributes"]["texCoords"]["size"], 2);
        assert_eq!(json["indices"], serde_json::json!([0, 1, 2]));
    }
}
