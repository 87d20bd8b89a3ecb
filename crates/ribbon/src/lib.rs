pub mod config;
pub mod error;
pub mod extrude;
pub mod mesh;
pub mod polyline;
pub mod renderable;
pub mod tangents;
pub mod track;

pub use config::*;
pub use error::*;
pub use extrude::*;
pub use mesh::*;
pub use polyline::*;
pub use renderable::*;
pub use tangents::*;
pub use track::*;
