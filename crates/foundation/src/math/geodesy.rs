use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Geographic coordinates: degrees, degrees, meters above sea level.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub elevation: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64, elevation: f64) -> Self {
        Self {
            lon,
            lat,
            elevation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.elevation.is_finite()
    }
}

/// Radius of curvature in the meridian at `lat_rad` (meters).
pub fn meridian_radius(lat_rad: f64) -> f64 {
    let s = lat_rad.sin();
    let w2 = 1.0 - WGS84_E2 * s * s;
    WGS84_A * (1.0 - WGS84_E2) / (w2 * w2.sqrt())
}

/// Radius of curvature in the prime vertical at `lat_rad` (meters).
pub fn prime_vertical_radius(lat_rad: f64) -> f64 {
    let s = lat_rad.sin();
    WGS84_A / (1.0 - WGS84_E2 * s * s).sqrt()
}

/// Wrap a longitude difference into `[-180, 180)`.
pub fn wrap_lon_delta(delta_deg: f64) -> f64 {
    (delta_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap a longitude into `(-180, 180]`.
pub fn wrap_lon(lon_deg: f64) -> f64 {
    let w = wrap_lon_delta(lon_deg);
    if w == -180.0 { 180.0 } else { w }
}

/// Vertex centroid of a footprint, elevation 0.
///
/// Longitudes are unwrapped relative to the first point so a footprint
/// straddling the antimeridian averages to a point inside it.
pub fn centroid<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<GeoPoint> {
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    let mut sum_dlon = 0.0;
    let mut sum_lat = first.lat;
    let mut n = 1usize;
    for p in iter {
        sum_dlon += wrap_lon_delta(p.lon - first.lon);
        sum_lat += p.lat;
        n += 1;
    }
    let n = n as f64;
    Some(GeoPoint::new(
        wrap_lon(first.lon + sum_dlon / n),
        sum_lat / n,
        0.0,
    ))
}
