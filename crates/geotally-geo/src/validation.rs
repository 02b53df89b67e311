//! Geometry validity checks and the repair path for region boundaries.

use geo::{Area, BooleanOps, Buffer, MultiPolygon, Point, Validation};
use geotally_core::error::{GeotallyError, Result};
use serde::Serialize;
use std::fmt;

/// Outcome of normalizing one record's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryStatus {
    /// Valid as loaded
    Valid,
    /// Invalid as loaded, repaired into a valid geometry
    Repaired,
    /// Invalid as loaded and not repairable
    Degenerate,
    /// Usable as loaded but lost in reprojection into the metric CRS
    Unprojectable,
    /// No geometry in the source
    Missing,
}

impl GeometryStatus {
    /// True when the record has a geometry the matcher can use
    pub fn is_usable(&self) -> bool {
        matches!(self, GeometryStatus::Valid | GeometryStatus::Repaired)
    }
}

impl fmt::Display for GeometryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeometryStatus::Valid => "valid",
            GeometryStatus::Repaired => "repaired",
            GeometryStatus::Degenerate => "degenerate",
            GeometryStatus::Unprojectable => "unprojectable",
            GeometryStatus::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// Status counts for one normalized table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationSummary {
    pub total: usize,
    pub valid: usize,
    pub repaired: usize,
    pub degenerate: usize,
    pub unprojectable: usize,
    pub missing: usize,
}

impl NormalizationSummary {
    pub fn from_statuses(statuses: &[GeometryStatus]) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.record(*status);
        }
        summary
    }

    pub fn record(&mut self, status: GeometryStatus) {
        self.total += 1;
        match status {
            GeometryStatus::Valid => self.valid += 1,
            GeometryStatus::Repaired => self.repaired += 1,
            GeometryStatus::Degenerate => self.degenerate += 1,
            GeometryStatus::Unprojectable => self.unprojectable += 1,
            GeometryStatus::Missing => self.missing += 1,
        }
    }

    /// Records that were present but invalid as loaded. Reprojection
    /// failures are counted in `unprojectable` instead.
    pub fn invalid_before(&self) -> usize {
        self.repaired + self.degenerate
    }

    /// Records usable after repair
    pub fn valid_after(&self) -> usize {
        self.valid + self.repaired
    }
}

/// Validate a point location
pub fn validate_point(feature_id: &str, point: &Point<f64>) -> Result<()> {
    // Check for NaN or infinite coordinates
    if !point.x().is_finite() || !point.y().is_finite() {
        return Err(GeotallyError::InvalidGeometry {
            feature_id: feature_id.to_string(),
            reason: format!("Coordinates must be finite, got ({}, {})", point.x(), point.y()),
        });
    }
    Ok(())
}

/// Validate a region boundary
pub fn validate_region(feature_id: &str, geometry: &MultiPolygon<f64>) -> Result<()> {
    if geometry.0.is_empty() {
        return Err(GeotallyError::InvalidGeometry {
            feature_id: feature_id.to_string(),
            reason: "Region has no polygons".to_string(),
        });
    }

    if let Some(error) = geometry.validation_errors().into_iter().next() {
        return Err(GeotallyError::InvalidGeometry {
            feature_id: feature_id.to_string(),
            reason: error.to_string(),
        });
    }

    Ok(())
}

/// Attempt to repair an invalid boundary.
///
/// A zero-distance buffer goes first. If it yields nothing usable, the
/// polygons are unioned against an empty set, which rebuilds rings through
/// the overlay. Returns `None` when neither produces a non-empty valid result.
pub fn repair_region(geometry: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    if has_non_finite_coords(geometry) {
        return None;
    }

    let buffered = geometry.buffer(0.0);
    if is_usable(&buffered) {
        return Some(buffered);
    }

    let unioned = geometry.union(&MultiPolygon::new(vec![]));
    if is_usable(&unioned) {
        return Some(unioned);
    }

    None
}

/// Check a boundary and repair it when needed
pub fn check_region(feature_id: &str, geometry: &MultiPolygon<f64>) -> (MultiPolygon<f64>, GeometryStatus) {
    if geometry.0.is_empty() {
        return (MultiPolygon::new(vec![]), GeometryStatus::Missing);
    }

    match validate_region(feature_id, geometry) {
        Ok(()) => (geometry.clone(), GeometryStatus::Valid),
        Err(e) => match repair_region(geometry) {
            Some(repaired) => {
                tracing::debug!(region = feature_id, reason = %e, "Repaired region geometry");
                (repaired, GeometryStatus::Repaired)
            }
            None => {
                tracing::warn!(region = feature_id, reason = %e, "Region geometry could not be repaired");
                (MultiPolygon::new(vec![]), GeometryStatus::Degenerate)
            }
        },
    }
}

/// Check a point location; points have no repair path
pub fn check_point(feature_id: &str, location: Option<&Point<f64>>) -> (Option<Point<f64>>, GeometryStatus) {
    match location {
        None => (None, GeometryStatus::Missing),
        Some(point) => match validate_point(feature_id, point) {
            Ok(()) => (Some(*point), GeometryStatus::Valid),
            Err(e) => {
                tracing::debug!(point = feature_id, reason = %e, "Unusable point location");
                (None, GeometryStatus::Degenerate)
            }
        },
    }
}

fn is_usable(geometry: &MultiPolygon<f64>) -> bool {
    !geometry.0.is_empty() && geometry.unsigned_area() > 0.0 && geometry.is_valid()
}

fn has_non_finite_coords(geometry: &MultiPolygon<f64>) -> bool {
    geometry.0.iter().any(|polygon| {
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.0.iter())
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn square(x0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: 0.0),
            (x: x0 + size, y: 0.0),
            (x: x0 + size, y: size),
            (x: x0, y: size),
            (x: x0, y: 0.0),
        ]
    }

    #[test]
    fn test_valid_region_passes_through() {
        let geometry = MultiPolygon::new(vec![square(0.0, 10.0)]);
        let (checked, status) = check_region("R1", &geometry);
        assert_eq!(status, GeometryStatus::Valid);
        assert_eq!(checked, geometry);
    }

    #[test]
    fn test_bowtie_is_repaired() {
        let bowtie: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let geometry = MultiPolygon::new(vec![bowtie]);
        assert!(validate_region("bowtie", &geometry).is_err());

        let (repaired, status) = check_region("bowtie", &geometry);
        assert_eq!(status, GeometryStatus::Repaired);
        assert!(repaired.is_valid());
        assert!(repaired.unsigned_area() > 0.0);
    }

    #[test]
    fn test_non_finite_region_is_degenerate() {
        let broken: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let (geometry, status) = check_region("nan", &MultiPolygon::new(vec![broken]));
        assert_eq!(status, GeometryStatus::Degenerate);
        assert!(geometry.0.is_empty());
    }

    #[test]
    fn test_empty_region_is_missing() {
        let (_, status) = check_region("empty", &MultiPolygon::new(vec![]));
        assert_eq!(status, GeometryStatus::Missing);
        assert!(!status.is_usable());
    }

    #[test]
    fn test_point_checks() {
        assert_eq!(check_point("a", None).1, GeometryStatus::Missing);
        assert_eq!(check_point("b", Some(&Point::new(f64::INFINITY, 1.0))).1, GeometryStatus::Degenerate);

        let (location, status) = check_point("c", Some(&Point::new(-99.1, 19.4)));
        assert_eq!(status, GeometryStatus::Valid);
        assert_eq!(location, Some(Point::new(-99.1, 19.4)));
    }

    #[test]
    fn test_summary_counts() {
        let summary = NormalizationSummary::from_statuses(&[
            GeometryStatus::Valid,
            GeometryStatus::Repaired,
            GeometryStatus::Degenerate,
            GeometryStatus::Missing,
            GeometryStatus::Valid,
        ]);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.invalid_before(), 2);
        assert_eq!(summary.valid_after(), 3);
    }
}
