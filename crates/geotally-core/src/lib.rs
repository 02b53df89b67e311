//! Geotally Core - Domain models, configuration and aggregation
//!
//! This crate contains the geometry tables, the assignment table, the layered
//! configuration and the pure (geometry-free) aggregation over assignments.

pub mod aggregate;
pub mod attributes;
pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{GeotallyError, Result};
