//! Track-level driver: geographic points in, placed ribbon mesh out.

use foundation::math::{GeoPoint, LocalFrame, centroid};
use tracing::debug;

use crate::config::ExtrudeConfig;
use crate::error::{ExtrudeError, TrackError};
use crate::extrude::extrude;
use crate::mesh::{MeshBundle, assemble};
use crate::polyline::{Polyline, clean_coords};
use crate::tangents::compute_normals;

/// Extruded ribbon of one track, in meters relative to `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMesh {
    pub origin: GeoPoint,
    pub width: f64,
    /// 3D arc length of the centerline.
    pub length_m: f64,
    pub point_count: usize,
    pub mesh: MeshBundle,
}

/// Extrude one track, projecting around `config.origin` or the track centroid.
pub fn extrude_track(points: &[GeoPoint], config: &ExtrudeConfig) -> Result<TrackMesh, ExtrudeError> {
    config.validate()?;
    let cleaned;
    let points = if config.clean_coords {
        cleaned = clean_coords(points);
        cleaned.as_slice()
    } else {
        points
    };

    let origin = match config.origin {
        Some(origin) => origin,
        None => centroid(points).ok_or(ExtrudeError::InvalidPolyline { len: 0 })?,
    };
    build(points, &LocalFrame::new(origin), config)
}

/// Extrude several tracks around one shared origin.
///
/// Without a configured origin the tracks are centered on the centroid of
/// all their points, so the meshes line up in one local frame.
pub fn extrude_tracks(
    tracks: &[Vec<GeoPoint>],
    config: &ExtrudeConfig,
) -> Result<Vec<TrackMesh>, TrackError> {
    config.validate().map_err(TrackError::Config)?;
    let tracks: Vec<Vec<GeoPoint>> = if config.clean_coords {
        tracks.iter().map(|t| clean_coords(t)).collect()
    } else {
        tracks.to_vec()
    };

    let origin = match config.origin {
        Some(origin) => origin,
        None => match centroid(tracks.iter().flatten()) {
            Some(origin) => origin,
            None if tracks.is_empty() => return Ok(Vec::new()),
            None => {
                return Err(TrackError::Track {
                    track: 0,
                    source: ExtrudeError::InvalidPolyline { len: 0 },
                });
            }
        },
    };

    let frame = LocalFrame::new(origin);
    tracks
        .iter()
        .enumerate()
        .map(|(track, points)| {
            build(points, &frame, config).map_err(|source| TrackError::Track { track, source })
        })
        .collect()
}

fn build(
    points: &[GeoPoint],
    frame: &LocalFrame,
    config: &ExtrudeConfig,
) -> Result<TrackMesh, ExtrudeError> {
    let width = config.width;
    let mut polyline = Polyline::from_geo(points, frame)?;
    if config.clean_coords {
        polyline = polyline.merge_close_points()?;
    }
    let normals = compute_normals(&polyline)?;
    let (side, top) = extrude(&polyline, &normals, width)?;
    let length_m = polyline.cumulative_lengths().last().copied().unwrap_or(0.0);

    let origin = frame.origin();
    debug!(
        lon = origin.lon,
        lat = origin.lat,
        points = polyline.vertex_count(),
        length_m,
        "built track mesh"
    );

    Ok(TrackMesh {
        origin,
        width,
        length_m,
        point_count: polyline.vertex_count(),
        mesh: assemble(side, top),
    })
}
