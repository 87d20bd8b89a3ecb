use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{MeshManifest, MeshPackage, PackageTrack, TrackCollection};
use foundation::math::GeoPoint;
use ribbon::{ExtrudeConfig, extrude_tracks};
use tracing::info;

/// Environment fallback for `--width`.
pub const WIDTH_ENV: &str = "RIBBON_WIDTH";
pub const DEFAULT_WIDTH: &str = "10";

#[derive(Parser, Debug)]
#[command(author, version, about = "Extrude GPS tracks into 3D ribbon meshes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extrude every LineString of a GeoJSON file into a mesh package
    Extrude {
        /// GeoJSON FeatureCollection, Feature, LineString or MultiLineString
        input: PathBuf,

        /// Output package directory
        out_dir: PathBuf,

        /// Ribbon width in meters (falls back to the config file, then RIBBON_WIDTH)
        #[arg(long)]
        width: Option<f64>,

        /// Projection origin: lon,lat[,elevation] (default: centroid of all tracks)
        #[arg(long)]
        origin: Option<String>,

        /// JSON file with width / origin / clean_coords
        #[arg(long)]
        config: Option<PathBuf>,

        /// Merge consecutive points less than a micron apart before extruding
        #[arg(long)]
        clean: bool,

        /// Package name stored in the manifest
        #[arg(long)]
        name: Option<String>,
    },

    /// Verify a mesh package and print per-track statistics
    Inspect {
        /// Package directory containing ribbon.manifest.json
        package: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Extrude {
            input,
            out_dir,
            width,
            origin,
            config,
            clean,
            name,
        } => {
            let file_config = match config {
                Some(path) => Some(read_config(&path)?),
                None => None,
            };
            let origin = origin.as_deref().map(parse_origin).transpose()?;
            let env_width = env::var(WIDTH_ENV).unwrap_or_else(|_| DEFAULT_WIDTH.to_string());
            let config = resolve_config(file_config, width, origin, clean, &env_width)?;
            cmd_extrude(&input, &out_dir, &config, name.as_deref())
        }
        Command::Inspect { package } => {
            let package =
                MeshPackage::load(&package).map_err(|e| format!("load {package:?}: {e}"))?;
            print!("{}", format_summary(package.manifest()));
            Ok(())
        }
    }
}

fn read_config(path: &Path) -> Result<ExtrudeConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("parse config {path:?}: {e}"))
}

/// Merge flags over the config file over the environment width.
pub fn resolve_config(
    file: Option<ExtrudeConfig>,
    width: Option<f64>,
    origin: Option<GeoPoint>,
    clean: bool,
    env_width: &str,
) -> Result<ExtrudeConfig, String> {
    let mut config = match file {
        Some(config) => config,
        None => {
            let width = env_width
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("{WIDTH_ENV} must be a number, got {env_width:?}"))?;
            ExtrudeConfig::new(width)
        }
    };
    if let Some(width) = width {
        config.width = width;
    }
    if origin.is_some() {
        config.origin = origin;
    }
    config.clean_coords |= clean;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Parse `lon,lat` or `lon,lat,elevation`.
pub fn parse_origin(s: &str) -> Result<GeoPoint, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| format!("origin must be lon,lat[,elevation], got {s:?}"))?;
    let point = match parts.as_slice() {
        [lon, lat] => GeoPoint::new(*lon, *lat, 0.0),
        [lon, lat, elevation] => GeoPoint::new(*lon, *lat, *elevation),
        _ => return Err(format!("origin must be lon,lat[,elevation], got {s:?}")),
    };
    if !point.is_finite() || point.lat.abs() > 90.0 {
        return Err(format!("origin out of range: {s:?}"));
    }
    Ok(point)
}

pub fn cmd_extrude(
    input: &Path,
    out_dir: &Path,
    config: &ExtrudeConfig,
    name: Option<&str>,
) -> Result<(), String> {
    let text = fs::read_to_string(input).map_err(|e| format!("read {input:?}: {e}"))?;
    let collection =
        TrackCollection::from_geojson_str(&text).map_err(|e| format!("parse geojson: {e}"))?;
    if collection.is_empty() {
        return Err(format!("no LineString tracks in {input:?}"));
    }

    let meshes = extrude_tracks(&collection.point_lists(), config).map_err(|e| {
        format!("extrude {input:?}: {e}")
    })?;
    let tracks: Vec<PackageTrack<'_>> = collection
        .tracks
        .iter()
        .zip(&meshes)
        .map(|(track, mesh)| PackageTrack {
            name: track.name.as_deref(),
            mesh,
        })
        .collect();

    fs::create_dir_all(out_dir).map_err(|e| format!("create {out_dir:?}: {e}"))?;
    let package =
        MeshPackage::write(out_dir, name, &tracks).map_err(|e| format!("write package: {e}"))?;

    let origin = package.manifest().origin;
    info!(
        tracks = tracks.len(),
        points = collection.point_count(),
        width = config.width,
        "extruded tracks"
    );
    eprintln!(
        "wrote {} (tracks={}, origin={:.6},{:.6})",
        out_dir.join(formats::MANIFEST_FILE_NAME).display(),
        tracks.len(),
        origin.lon,
        origin.lat
    );
    Ok(())
}

/// Human-readable package report, one block per track.
pub fn format_summary(manifest: &MeshManifest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} v{}: {} track(s), width {} m, origin {:.6},{:.6}",
        manifest.name.as_deref().unwrap_or("(unnamed)"),
        manifest.version,
        manifest.tracks.len(),
        manifest.width,
        manifest.origin.lon,
        manifest.origin.lat
    );
    for track in &manifest.tracks {
        let _ = writeln!(
            out,
            "{} {}: {} points, {:.1} m",
            track.id,
            track.name.as_deref().unwrap_or("-"),
            track.point_count,
            track.length_m
        );
        let _ = writeln!(
            out,
            "  side: {} vertices, {} triangles",
            track.side.vertex_count, track.side.triangle_count
        );
        let _ = writeln!(
            out,
            "  top:  {} vertices, {} triangles",
            track.top.vertex_count, track.top.triangle_count
        );
        if let Some(bounds) = &track.bounds {
            let _ = writeln!(
                out,
                "  bounds: [{:.1}, {:.1}, {:.1}] .. [{:.1}, {:.1}, {:.1}]",
                bounds.min[0], bounds.min[1], bounds.min[2], bounds.max[0], bounds.max[1],
                bounds.max[2]
            );
        }
        for buffer in track.side.buffers.iter().chain(&track.top.buffers) {
            let _ = writeln!(out, "  {} blake3={}", buffer.path, buffer.content_hash);
        }
    }
    out
}
