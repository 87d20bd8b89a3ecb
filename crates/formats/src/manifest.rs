use foundation::Aabb3;
use foundation::math::GeoPoint;
use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshManifest {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Geographic anchor of every track's local coordinates.
    pub origin: GeoPoint,
    /// Ribbon width in meters.
    pub width: f64,
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub point_count: usize,
    pub length_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Aabb3>,
    pub side: GeometryEntry,
    pub top: GeometryEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryEntry {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub buffers: Vec<BufferEntry>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    F32,
    U32,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::F32 | ComponentType::U32 => 4,
        }
    }
}

/// One little-endian binary buffer file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferEntry {
    /// Attribute name, or `indices`.
    pub name: String,
    /// Path relative to the package root.
    pub path: String,
    pub component: ComponentType,
    /// Components per element.
    pub stride: usize,
    /// Number of elements (vertices, or triangles for indices).
    pub count: usize,
    pub content_hash: String,
}

impl BufferEntry {
    /// Expected file size; `None` when the entry's sizes overflow.
    pub fn byte_len(&self) -> Option<usize> {
        self.count
            .checked_mul(self.stride)?
            .checked_mul(self.component.byte_size())
    }
}

impl GeometryEntry {
    pub fn buffer(&self, name: &str) -> Option<&BufferEntry> {
        self.buffers.iter().find(|b| b.name == name)
    }
}

impl MeshManifest {
    pub fn new(origin: GeoPoint, width: f64) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            name: None,
            origin,
            width,
            tracks: Vec::new(),
        }
    }

    /// Every buffer of every track, side before top.
    pub fn buffers(&self) -> impl Iterator<Item = &BufferEntry> {
        self.tracks
            .iter()
            .flat_map(|t| t.side.buffers.iter().chain(t.top.buffers.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferEntry, ComponentType, GeometryEntry, MeshManifest, TrackEntry};
    use foundation::math::GeoPoint;
    use pretty_assertions::assert_eq;

    fn entry(name: &str, component: ComponentType, stride: usize, count: usize) -> BufferEntry {
        BufferEntry {
            name: name.to_string(),
            path: format!("track-0/{name}.bin"),
            component,
            stride,
            count,
            content_hash: String::new(),
        }
    }

    #[test]
    fn serializes_component_types_lowercase() {
        let json = serde_json::to_value(entry("indices", ComponentType::U32, 3, 4))
            .expect("serialize");
        assert_eq!(json["component"], "u32");
        assert_eq!(entry("positions", ComponentType::F32, 3, 8).byte_len(), Some(96));
    }

    #[test]
    fn oversized_entry_has_no_byte_len() {
        assert_eq!(entry("positions", ComponentType::F32, 3, usize::MAX / 2).byte_len(), None);
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let mut manifest = MeshManifest::new(GeoPoint::new(7.0, 46.0, 0.0), 12.0);
        manifest.tracks.push(TrackEntry {
            id: "track-0".to_string(),
            name: None,
            point_count: 2,
            length_m: 111.25,
            bounds: None,
            side: GeometryEntry {
                vertex_count: 8,
                triangle_count: 10,
                buffers: vec![entry("positions", ComponentType::F32, 3, 8)],
            },
            top: GeometryEntry {
                vertex_count: 4,
                triangle_count: 2,
                buffers: vec![entry("indices", ComponentType::U32, 3, 2)],
            },
        });

        let payload = serde_json::to_string_pretty(&manifest).expect("serialize");
        let back: MeshManifest = serde_json::from_str(&payload).expect("parse");
        assert_eq!(back, manifest);
        assert_eq!(back.buffers().count(), 2);
        assert_eq!(back.tracks[0].top.buffer("indices").map(|b| b.count), Some(2));
    }
}
