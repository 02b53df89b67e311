//! Geotally Geo - geometry normalization and point-to-region assignment
//!
//! This crate holds the region assignment engine: geometry repair and
//! reprojection, buffered containment matching, and the nearest-centroid
//! fallback that guarantees every point a region.

pub mod context;
pub mod engine;
pub mod nearest;
pub mod normalize;
pub mod spatial;
pub mod transform;
pub mod validation;

pub use context::RunContext;
pub use engine::{AssignmentOutcome, AssignmentReport, RegionAssigner};
pub use transform::{ProjLibrary, ProjectionSource};
pub use validation::{GeometryStatus, NormalizationSummary};
