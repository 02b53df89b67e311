//! Loading and writing geometry tables
//!
//! Only GeoJSON is supported. The loader tolerates missing and odd geometries
//! (they become missing locations or empty regions) because the assignment
//! engine is responsible for flagging them; it only fails on whole-file
//! problems such as an absent or unparsable file.

pub mod geojson;

pub use self::geojson::{GeoJsonReader, GeoJsonWriter};

/// Property names tried, in order, for a point's address
pub const ADDRESS_FIELDS: &[&str] = &["direccion", "address", "addr:street", "addr_street"];
