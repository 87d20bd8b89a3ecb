pub mod manifest;
pub mod mesh_package;
pub mod track_geojson;

pub use manifest::*;
pub use mesh_package::*;
pub use track_geojson::*;
