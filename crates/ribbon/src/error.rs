/// Structural failures that abort an extrusion.
///
/// Numerical edge cases (fold-backs, vertical tangents) never show up here;
/// the solver absorbs them with fallback vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtrudeError {
    /// Fewer than two points.
    InvalidPolyline { len: usize },
    /// Vertex `index` coincides with vertex `index - 1` in the horizontal plane.
    DegenerateSegment { index: usize },
    /// Width is not a finite positive number.
    InvalidWidth { width: f64 },
    NormalCountMismatch { vertices: usize, normals: usize },
}

impl std::fmt::Display for ExtrudeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtrudeError::InvalidPolyline { len } => {
                write!(f, "polyline must have at least 2 points, got {len}")
            }
            ExtrudeError::DegenerateSegment { index } => write!(
                f,
                "zero-length segment between points {} and {index}",
                index.saturating_sub(1)
            ),
            ExtrudeError::InvalidWidth { width } => {
                write!(f, "ribbon width must be a positive number of meters, got {width}")
            }
            ExtrudeError::NormalCountMismatch { vertices, normals } => {
                write!(f, "expected {vertices} vertex normals, got {normals}")
            }
        }
    }
}

impl std::error::Error for ExtrudeError {}

/// A multi-track build failed on one track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    Track { track: usize, source: ExtrudeError },
    Config(ExtrudeError),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::Track { track, source } => write!(f, "track {track}: {source}"),
            TrackError::Config(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackError::Track { source, .. } => Some(source),
            TrackError::Config(err) => Some(err),
        }
    }
}
