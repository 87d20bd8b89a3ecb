use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ribbon::{Attribute, Geometry, MeshBundle, MeshError, Topology, TrackMesh};
use tracing::{debug, info};

use crate::manifest::{
    BufferEntry, ComponentType, GeometryEntry, MANIFEST_VERSION, MeshManifest, TrackEntry,
};

pub const MANIFEST_FILE_NAME: &str = "ribbon.manifest.json";

const INDICES: &str = "indices";

/// A directory holding `ribbon.manifest.json` plus one `.bin` file per buffer.
#[derive(Debug, Clone)]
pub struct MeshPackage {
    root: PathBuf,
    manifest: MeshManifest,
}

/// One track handed to [`MeshPackage::write`].
#[derive(Debug, Clone, Copy)]
pub struct PackageTrack<'a> {
    pub name: Option<&'a str>,
    pub mesh: &'a TrackMesh,
}

#[derive(Debug)]
pub enum MeshPackageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    UnsupportedVersion {
        found: String,
    },
    Empty,
    MixedOrigins {
        track: usize,
    },
    MixedWidths {
        track: usize,
    },
    Mesh {
        track: usize,
        source: MeshError,
    },
    MissingTrack {
        index: usize,
    },
    MissingBuffer {
        track: usize,
        name: String,
    },
    InvalidEntry {
        path: String,
        reason: String,
    },
    BufferLength {
        path: String,
        expected: usize,
        found: usize,
    },
    HashMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

impl fmt::Display for MeshPackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshPackageError::Io { path, source } => {
                write!(f, "I/O error at {}: {source}", path.display())
            }
            MeshPackageError::Json(err) => write!(f, "Manifest JSON error: {err}"),
            MeshPackageError::UnsupportedVersion { found } => {
                write!(f, "Unsupported manifest version: {found}")
            }
            MeshPackageError::Empty => write!(f, "package needs at least one track"),
            MeshPackageError::MixedOrigins { track } => {
                write!(f, "track {track} uses a different origin than track 0")
            }
            MeshPackageError::MixedWidths { track } => {
                write!(f, "track {track} uses a different width than track 0")
            }
            MeshPackageError::Mesh { track, source } => write!(f, "track {track}: {source}"),
            MeshPackageError::MissingTrack { index } => write!(f, "no track at index {index}"),
            MeshPackageError::MissingBuffer { track, name } => {
                write!(f, "track {track} has no {name} buffer")
            }
            MeshPackageError::InvalidEntry { path, reason } => {
                write!(f, "invalid buffer entry {path}: {reason}")
            }
            MeshPackageError::BufferLength {
                path,
                expected,
                found,
            } => write!(f, "{path}: expected {expected} bytes, found {found}"),
            MeshPackageError::HashMismatch {
                path,
                expected,
                found,
            } => write!(f, "{path}: content hash {found} does not match {expected}"),
        }
    }
}

impl std::error::Error for MeshPackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshPackageError::Io { source, .. } => Some(source),
            MeshPackageError::Json(err) => Some(err),
            MeshPackageError::Mesh { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MeshPackageError + '_ {
    move |source| MeshPackageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl MeshPackage {
    /// Write `tracks` under `root`, replacing any manifest already there.
    ///
    /// All tracks must share one origin and width, as produced by
    /// [`extrude_tracks`](ribbon::extrude_tracks).
    pub fn write(
        root: impl AsRef<Path>,
        name: Option<&str>,
        tracks: &[PackageTrack<'_>],
    ) -> Result<Self, MeshPackageError> {
        let root = root.as_ref().to_path_buf();
        let first = tracks.first().ok_or(MeshPackageError::Empty)?;

        let mut manifest = MeshManifest::new(first.mesh.origin, first.mesh.width);
        manifest.name = name.map(str::to_string);

        for (index, track) in tracks.iter().enumerate() {
            if track.mesh.origin != manifest.origin {
                return Err(MeshPackageError::MixedOrigins { track: index });
            }
            if track.mesh.width != manifest.width {
                return Err(MeshPackageError::MixedWidths { track: index });
            }
            let bundle = &track.mesh.mesh;
            bundle
                .validate()
                .map_err(|source| MeshPackageError::Mesh {
                    track: index,
                    source,
                })?;

            let id = format!("track-{index:03}");
            let dir = root.join(&id);
            fs::create_dir_all(&dir).map_err(io_error(&dir))?;

            manifest.tracks.push(TrackEntry {
                name: track.name.map(str::to_string),
                point_count: track.mesh.point_count,
                length_m: track.mesh.length_m,
                bounds: bundle.bounds(),
                side: write_geometry(&root, &id, "side", &bundle.side)?,
                top: write_geometry(&root, &id, "top", &bundle.top)?,
                id,
            });
        }

        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let payload = serde_json::to_string_pretty(&manifest).map_err(MeshPackageError::Json)?;
        fs::write(&manifest_path, payload).map_err(io_error(&manifest_path))?;

        info!(
            path = %manifest_path.display(),
            tracks = manifest.tracks.len(),
            "wrote mesh package"
        );
        Ok(Self { root, manifest })
    }

    /// Read the manifest and verify every buffer's length and content hash.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, MeshPackageError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let payload = fs::read_to_string(&manifest_path).map_err(io_error(&manifest_path))?;
        let manifest: MeshManifest =
            serde_json::from_str(&payload).map_err(MeshPackageError::Json)?;

        if manifest.version != MANIFEST_VERSION {
            return Err(MeshPackageError::UnsupportedVersion {
                found: manifest.version,
            });
        }

        let package = Self { root, manifest };
        for entry in package.manifest.buffers() {
            package.read_buffer(entry)?;
        }
        debug!(
            root = %package.root.display(),
            tracks = package.manifest.tracks.len(),
            "verified mesh package"
        );
        Ok(package)
    }

    pub fn manifest(&self) -> &MeshManifest {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode the side and top geometry of track `index`.
    pub fn read_track(&self, index: usize) -> Result<MeshBundle, MeshPackageError> {
        let entry = self
            .manifest
            .tracks
            .get(index)
            .ok_or(MeshPackageError::MissingTrack { index })?;
        let bundle = MeshBundle {
            side: self.read_geometry(index, &entry.side)?,
            top: self.read_geometry(index, &entry.top)?,
        };
        bundle.validate().map_err(|source| MeshPackageError::Mesh {
            track: index,
            source,
        })?;
        Ok(bundle)
    }

    fn read_geometry(
        &self,
        track: usize,
        entry: &GeometryEntry,
    ) -> Result<Geometry, MeshPackageError> {
        let mut attributes = BTreeMap::new();
        let mut indices = None;
        for buffer in &entry.buffers {
            let bytes = self.read_buffer(buffer)?;
            match buffer.component {
                ComponentType::U32 if buffer.name == INDICES => {
                    indices = Some(decode_u32(&bytes));
                }
                ComponentType::U32 => {
                    debug!(track, name = %buffer.name, "skipping u32 attribute buffer");
                }
                ComponentType::F32 => {
                    attributes.insert(
                        buffer.name.clone(),
                        Attribute::new(buffer.stride, decode_f32(&bytes)),
                    );
                }
            }
        }

        let indices = indices.ok_or_else(|| MeshPackageError::MissingBuffer {
            track,
            name: INDICES.to_string(),
        })?;
        Ok(Geometry {
            topology: Topology::TriangleList,
            attributes,
            indices,
        })
    }

    fn read_buffer(&self, entry: &BufferEntry) -> Result<Vec<u8>, MeshPackageError> {
        let invalid = |reason: &str| MeshPackageError::InvalidEntry {
            path: entry.path.clone(),
            reason: reason.to_string(),
        };
        let rel = Path::new(&entry.path);
        let inside = rel.components().all(|c| matches!(c, Component::Normal(_)));
        if rel.as_os_str().is_empty() || !inside {
            return Err(invalid("path must stay inside the package"));
        }
        let expected = entry
            .byte_len()
            .ok_or_else(|| invalid("count * stride overflows"))?;

        let path = self.root.join(rel);
        let bytes = fs::read(&path).map_err(io_error(&path))?;
        if bytes.len() != expected {
            return Err(MeshPackageError::BufferLength {
                path: entry.path.clone(),
                expected,
                found: bytes.len(),
            });
        }
        let found = content_hash(&bytes);
        if found != entry.content_hash {
            return Err(MeshPackageError::HashMismatch {
                path: entry.path.clone(),
                expected: entry.content_hash.clone(),
                found,
            });
        }
        Ok(bytes)
    }
}

fn write_geometry(
    root: &Path,
    track_id: &str,
    part: &str,
    geometry: &Geometry,
) -> Result<GeometryEntry, MeshPackageError> {
    let vertex_count = geometry.vertex_count();
    let mut buffers = Vec::with_capacity(geometry.attributes.len() + 1);

    for (name, attr) in &geometry.attributes {
        let bytes = encode_f32(&attr.value);
        buffers.push(write_buffer(
            root,
            format!("{track_id}/{part}.{name}.bin"),
            name,
            ComponentType::F32,
            attr.size,
            vertex_count,
            &bytes,
        )?);
    }

    let bytes = encode_u32(&geometry.indices);
    buffers.push(write_buffer(
        root,
        format!("{track_id}/{part}.{INDICES}.bin"),
        INDICES,
        ComponentType::U32,
        3,
        geometry.triangle_count(),
        &bytes,
    )?);

    Ok(GeometryEntry {
        vertex_count,
        triangle_count: geometry.triangle_count(),
        buffers,
    })
}

fn write_buffer(
    root: &Path,
    rel_path: String,
    name: &str,
    component: ComponentType,
    stride: usize,
    count: usize,
    bytes: &[u8],
) -> Result<BufferEntry, MeshPackageError> {
    let path = root.join(&rel_path);
    fs::write(&path, bytes).map_err(io_error(&path))?;
    Ok(BufferEntry {
        name: name.to_string(),
        path: rel_path,
        component,
        stride,
        count,
        content_hash: content_hash(bytes),
    })
}

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn encode_f32(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn encode_u32(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn decode_u32(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{MANIFEST_FILE_NAME, MeshPackage, MeshPackageError, PackageTrack};
    use crate::manifest::{ComponentType, MeshManifest};
    use foundation::math::GeoPoint;
    use pretty_assertions::assert_eq;
    use ribbon::{ExtrudeConfig, TrackMesh, extrude_track, extrude_tracks};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let id = format!("ribbon_mesh_package_{label}_{}", std::process::id());
        dir.push(id);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn sample_tracks() -> Vec<TrackMesh> {
        let tracks = vec![
            vec![
                GeoPoint::new(8.54, 47.37, 410.0),
                GeoPoint::new(8.541, 47.371, 412.0),
                GeoPoint::new(8.543, 47.371, 415.0),
            ],
            vec![
                GeoPoint::new(8.55, 47.36, 420.0),
                GeoPoint::new(8.55, 47.362, 418.0),
            ],
        ];
        extrude_tracks(&tracks, &ExtrudeConfig::new(6.0)).expect("extrude")
    }

    fn package_tracks(meshes: &[TrackMesh]) -> Vec<PackageTrack<'_>> {
        meshes
            .iter()
            .map(|mesh| PackageTrack { name: None, mesh })
            .collect()
    }

    #[test]
    fn write_then_load_round_trips_buffers() {
        let root = temp_dir("round_trip");
        let meshes = sample_tracks();
        let mut tracks = package_tracks(&meshes);
        tracks[0].name = Some("Uetliberg");

        let written = MeshPackage::write(&root, Some("Zurich"), &tracks).expect("write");
        assert!(root.join(MANIFEST_FILE_NAME).exists());
        assert_eq!(written.manifest().tracks.len(), 2);

        let loaded = MeshPackage::load(&root).expect("load");
        let manifest = loaded.manifest();
        assert_eq!(manifest.name.as_deref(), Some("Zurich"));
        assert_eq!(manifest.tracks[0].name.as_deref(), Some("Uetliberg"));
        assert_eq!(manifest.tracks[0].side.vertex_count, 12);
        assert_eq!(manifest.tracks[0].side.triangle_count, 16);
        assert_eq!(manifest.tracks[1].top.triangle_count, 2);

        let indices = manifest.tracks[1].side.buffer("indices").expect("indices");
        assert_eq!(indices.component, ComponentType::U32);
        assert_eq!(indices.path, "track-001/side.indices.bin");

        for (i, mesh) in meshes.iter().enumerate() {
            assert_eq!(loaded.read_track(i).expect("read track"), mesh.mesh);
        }
    }

    #[test]
    fn load_detects_tampered_buffer() {
        let root = temp_dir("tamper");
        let meshes = sample_tracks();
        MeshPackage::write(&root, None, &package_tracks(&meshes)).expect("write");

        let path = root.join("track-000/top.positions.bin");
        let mut bytes = fs::read(&path).expect("read buffer");
        bytes[0] ^= 0xff;
        fs::write(&path, bytes).expect("write buffer");

        match MeshPackage::load(&root).expect_err("tampered") {
            MeshPackageError::HashMismatch { path, .. } => {
                assert_eq!(path, "track-000/top.positions.bin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_detects_truncated_buffer() {
        let root = temp_dir("truncate");
        let meshes = sample_tracks();
        MeshPackage::write(&root, None, &package_tracks(&meshes)).expect("write");

        let path = root.join("track-001/side.indices.bin");
        let bytes = fs::read(&path).expect("read buffer");
        fs::write(&path, &bytes[..bytes.len() - 4]).expect("write buffer");

        assert!(matches!(
            MeshPackage::load(&root),
            Err(MeshPackageError::BufferLength { .. })
        ));
    }

    fn rewrite_manifest(root: &Path, edit: impl FnOnce(&mut MeshManifest)) {
        let path = root.join(MANIFEST_FILE_NAME);
        let payload = fs::read_to_string(&path).expect("read manifest");
        let mut manifest: MeshManifest = serde_json::from_str(&payload).expect("parse manifest");
        edit(&mut manifest);
        let payload = serde_json::to_string_pretty(&manifest).expect("serialize manifest");
        fs::write(&path, payload).expect("write manifest");
    }

    #[test]
    fn load_rejects_overflowing_buffer_count() {
        let root = temp_dir("overflow");
        let meshes = sample_tracks();
        MeshPackage::write(&root, None, &package_tracks(&meshes)).expect("write");
        rewrite_manifest(&root, |m| m.tracks[0].side.buffers[0].count = usize::MAX / 2);

        match MeshPackage::load(&root).expect_err("overflow") {
            MeshPackageError::InvalidEntry { reason, .. } => {
                assert_eq!(reason, "count * stride overflows");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_rejects_paths_outside_the_package() {
        let root = temp_dir("escape");
        let meshes = sample_tracks();
        MeshPackage::write(&root, None, &package_tracks(&meshes)).expect("write");

        let escapes = [
            "../track-000/side.positions.bin",
            "/etc/passwd",
            "./track-000/top.positions.bin",
            "",
        ];
        for bad in escapes {
            rewrite_manifest(&root, |m| m.tracks[0].top.buffers[0].path = bad.to_string());
            match MeshPackage::load(&root).expect_err("escaping path") {
                MeshPackageError::InvalidEntry { path, .. } => assert_eq!(path, bad),
                other => panic!("unexpected error for {bad:?}: {other}"),
            }
        }
    }

    #[test]
    fn rejects_unsupported_manifest_version() {
        let root = temp_dir("version");
        let meshes = sample_tracks();
        let package = MeshPackage::write(&root, None, &package_tracks(&meshes)).expect("write");

        let mut manifest = package.manifest().clone();
        manifest.version = "2.0".to_string();
        let payload = serde_json::to_string_pretty(&manifest).expect("serialize manifest");
        fs::write(root.join(MANIFEST_FILE_NAME), payload).expect("write manifest");

        match MeshPackage::load(&root).expect_err("expect version error") {
            MeshPackageError::UnsupportedVersion { found } => assert_eq!(found, "2.0"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_mixed_tracks_and_empty_input() {
        let root = temp_dir("mixed");
        let points = [GeoPoint::new(0.0, 0.0, 0.0), GeoPoint::new(0.0, 0.001, 0.0)];
        let a = extrude_track(&points, &ExtrudeConfig::new(2.0)).expect("a");
        let b = extrude_track(
            &points,
            &ExtrudeConfig::new(2.0).with_origin(GeoPoint::new(1.0, 1.0, 0.0)),
        )
        .expect("b");

        let err = MeshPackage::write(&root, None, &package_tracks(&[a, b])).expect_err("mixed");
        assert!(matches!(err, MeshPackageError::MixedOrigins { track: 1 }));

        let a = extrude_track(&points, &ExtrudeConfig::new(2.0)).expect("a");
        let c = extrude_track(&points, &ExtrudeConfig::new(3.0)).expect("c");
        let err = MeshPackage::write(&root, None, &package_tracks(&[a, c])).expect_err("widths");
        assert!(matches!(err, MeshPackageError::MixedWidths { track: 1 }));
        assert!(matches!(
            MeshPackage::write(&root, None, &[]),
            Err(MeshPackageError::Empty)
        ));
    }
}
