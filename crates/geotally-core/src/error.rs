//! Error types for Geotally

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeotallyError {
    // Input errors
    #[error("Required input not found at {path}")]
    MissingInput { path: PathBuf },

    #[error("No {what} found in input")]
    EmptyInput { what: String },

    #[error("Failed to read {format} input: {reason}")]
    Format { format: String, reason: String },

    // Geometry errors
    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    #[error("Projection from {from} to {to} unavailable: {reason}")]
    ProjectionUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    // Assignment errors
    #[error("{count} points remain unassigned after nearest-region fallback")]
    UnresolvedAssignment { count: usize },

    // Attribute table errors
    #[error("Attribute table is missing records for regions: {}", missing.join(", "))]
    AttributesIncomplete { missing: Vec<String> },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GeotallyError>;
