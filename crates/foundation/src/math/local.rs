use super::{GeoPoint, Vec3, meridian_radius, prime_vertical_radius, wrap_lon, wrap_lon_delta};

/// Smallest east scale used near the poles (meters per radian of longitude).
const MIN_EAST_SCALE: f64 = 1e-6;

/// Local planar coordinates in meters relative to an origin.
///
/// `x` points east, `y` north, `z` carries the elevation unchanged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for PlanarPoint {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Equirectangular tangent plane anchored at an origin.
///
/// Scales are the WGS84 radii of curvature at the origin latitude, so
/// distances close to the origin are metric. Error grows with distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LocalFrame {
    origin: GeoPoint,
    east_scale: f64,
    north_scale: f64,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self {
        let lat_rad = origin.lat.to_radians();
        let east_scale = (prime_vertical_radius(lat_rad) * lat_rad.cos()).max(MIN_EAST_SCALE);
        Self {
            origin,
            east_scale,
            north_scale: meridian_radius(lat_rad),
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn project(&self, point: GeoPoint) -> PlanarPoint {
        let dlon = wrap_lon_delta(point.lon - self.origin.lon).to_radians();
        let dlat = (point.lat - self.origin.lat).to_radians();
        PlanarPoint::new(dlon * self.east_scale, dlat * self.north_scale, point.elevation)
    }

    pub fn unproject(&self, point: PlanarPoint) -> GeoPoint {
        let dlon = (point.x / self.east_scale).to_degrees();
        let dlat = (point.y / self.north_scale).to_degrees();
        GeoPoint::new(
            wrap_lon(self.origin.lon + dlon),
            self.origin.lat + dlat,
            point.z,
        )
    }
}

pub fn project(point: GeoPoint, origin: GeoPoint) -> PlanarPoint {
    LocalFrame::new(origin).project(point)
}

pub fn unproject(point: PlanarPoint, origin: GeoPoint) -> GeoPoint {
    LocalFrame::new(origin).unproject(point)
}
