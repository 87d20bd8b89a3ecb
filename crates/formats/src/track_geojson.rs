use foundation::math::GeoPoint;
use serde_json::{Map, Value};
use tracing::debug;

/// One LineString worth of track points.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Index of the source feature (0 for a bare geometry).
    pub feature: usize,
    pub name: Option<String>,
    pub points: Vec<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackCollection {
    pub tracks: Vec<Track>,
}

#[derive(Debug)]
pub enum TrackGeoJsonError {
    Json(serde_json::Error),
    UnsupportedRoot { found: String },
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for TrackGeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackGeoJsonError::Json(err) => write!(f, "JSON parse error: {err}"),
            TrackGeoJsonError::UnsupportedRoot { found } => write!(
                f,
                "expected FeatureCollection, Feature, LineString or MultiLineString, got {found}"
            ),
            TrackGeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for TrackGeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackGeoJsonError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl TrackCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, TrackGeoJsonError> {
        let value: Value = serde_json::from_str(payload).map_err(TrackGeoJsonError::Json)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, TrackGeoJsonError> {
        let obj = value
            .as_object()
            .ok_or_else(|| TrackGeoJsonError::UnsupportedRoot {
                found: json_kind(value).to_string(),
            })?;
        let ty = obj.get("type").and_then(|v| v.as_str()).unwrap_or("untyped object");

        let mut out = TrackCollection::default();
        match ty {
            "FeatureCollection" => {
                let features = obj
                    .get("features")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| TrackGeoJsonError::UnsupportedRoot {
                        found: "FeatureCollection without features".to_string(),
                    })?;
                for (index, feature) in features.iter().enumerate() {
                    out.push_feature(index, feature)?;
                }
            }
            "Feature" => out.push_feature(0, value)?,
            "LineString" | "MultiLineString" => {
                let lines = parse_geometry(obj)
                    .map_err(|reason| TrackGeoJsonError::InvalidFeature { index: 0, reason })?;
                out.push_lines(0, None, lines.unwrap_or_default());
            }
            other => {
                return Err(TrackGeoJsonError::UnsupportedRoot {
                    found: other.to_string(),
                });
            }
        }
        Ok(out)
    }

    fn push_feature(&mut self, index: usize, value: &Value) -> Result<(), TrackGeoJsonError> {
        let invalid = |reason: String| TrackGeoJsonError::InvalidFeature { index, reason };

        let feat = value
            .as_object()
            .ok_or_else(|| invalid("feature must be an object".to_string()))?;
        match feat.get("type").and_then(|v| v.as_str()) {
            Some("Feature") => {}
            Some(other) => return Err(invalid(format!("unexpected feature type: {other}"))),
            None => return Err(invalid("feature missing type".to_string())),
        }

        let name = feat
            .get("properties")
            .and_then(|v| v.as_object())
            .and_then(|props| props.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let lines = match feat.get("geometry") {
            Some(Value::Object(geometry)) => parse_geometry(geometry).map_err(invalid)?,
            Some(Value::Null) => None,
            Some(_) => return Err(invalid("geometry must be an object".to_string())),
            None => return Err(invalid("feature missing geometry".to_string())),
        };

        match lines {
            Some(lines) => self.push_lines(index, name, lines),
            None => debug!(feature = index, "skipping feature without line geometry"),
        }
        Ok(())
    }

    fn push_lines(&mut self, feature: usize, name: Option<String>, lines: Vec<Vec<GeoPoint>>) {
        for points in lines {
            self.tracks.push(Track {
                feature,
                name: name.clone(),
                points,
            });
        }
    }

    /// Point lists in track order.
    pub fn point_lists(&self) -> Vec<Vec<GeoPoint>> {
        self.tracks.iter().map(|t| t.points.clone()).collect()
    }

    pub fn point_count(&self) -> usize {
        self.tracks.iter().map(|t| t.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Lines of a LineString or MultiLineString; `None` for other geometry types.
fn parse_geometry(obj: &Map<String, Value>) -> Result<Option<Vec<Vec<GeoPoint>>>, String> {
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = || {
        obj.get("coordinates")
            .ok_or("geometry missing coordinates".to_string())
    };

    match ty {
        "LineString" => Ok(Some(vec![parse_points(coords()?)?])),
        "MultiLineString" => Ok(Some(parse_lines(coords()?)?)),
        _ => Ok(None),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat] or [lon, lat, elevation]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    let elevation = match arr.get(2) {
        None | Some(Value::Null) => 0.0,
        Some(v) => v.as_f64().ok_or("elevation must be a number".to_string())?,
    };
    Ok(GeoPoint::new(lon, lat, elevation))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("LineString coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_lines(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("MultiLineString coordinates must be an array".to_string())?;
    arr.iter().map(parse_points).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
