//! Geometry normalization: repair, then reproject into the shared metric CRS.
//!
//! Records are never dropped. Anything that cannot be repaired stays in place
//! as `Degenerate`, anything that cannot be projected as `Unprojectable`, both
//! with an empty geometry, so the normalized tables line up index for index
//! with the loaded ones.

use crate::context::RunContext;
use crate::transform::{transform_point, transform_region, CoordTransform};
use crate::validation::{check_point, check_region, repair_region, GeometryStatus, NormalizationSummary};
use geo::{MultiPolygon, Point, Validation};
use geotally_core::models::{PointTable, RegionTable};

/// Region boundaries in the metric CRS, aligned with the region table
#[derive(Debug, Clone)]
pub struct NormalizedRegions {
    pub geometries: Vec<MultiPolygon<f64>>,
    pub statuses: Vec<GeometryStatus>,
    pub summary: NormalizationSummary,
}

/// Point locations in the metric CRS, aligned with the point table
#[derive(Debug, Clone)]
pub struct NormalizedPoints {
    pub locations: Vec<Option<Point<f64>>>,
    pub statuses: Vec<GeometryStatus>,
    pub summary: NormalizationSummary,
}

/// Repair and reproject every region
pub fn normalize_regions(
    ctx: &RunContext,
    table: &RegionTable,
    transform: &dyn CoordTransform,
) -> NormalizedRegions {
    let _guard = ctx.span().enter();

    let (geometries, statuses): (Vec<_>, Vec<_>) = table
        .regions
        .iter()
        .map(|region| normalize_region(&region.id, &region.geometry, transform))
        .unzip();

    let summary = NormalizationSummary::from_statuses(&statuses);
    tracing::info!(
        total = summary.total,
        invalid_before = summary.invalid_before(),
        valid_after = summary.valid_after(),
        repaired = summary.repaired,
        degenerate = summary.degenerate,
        unprojectable = summary.unprojectable,
        missing = summary.missing,
        "Normalized regions"
    );

    NormalizedRegions { geometries, statuses, summary }
}

/// Check and reproject every point location
pub fn normalize_points(
    ctx: &RunContext,
    table: &PointTable,
    transform: &dyn CoordTransform,
) -> NormalizedPoints {
    let _guard = ctx.span().enter();

    let (locations, statuses): (Vec<_>, Vec<_>) = table
        .points
        .iter()
        .map(|point| normalize_point(&point.id, point.location.as_ref(), transform))
        .unzip();

    let summary = NormalizationSummary::from_statuses(&statuses);
    tracing::info!(
        total = summary.total,
        valid = summary.valid,
        degenerate = summary.degenerate,
        unprojectable = summary.unprojectable,
        missing = summary.missing,
        "Normalized points"
    );

    NormalizedPoints { locations, statuses, summary }
}

fn normalize_region(
    id: &str,
    geometry: &MultiPolygon<f64>,
    transform: &dyn CoordTransform,
) -> (MultiPolygon<f64>, GeometryStatus) {
    let (checked, status) = check_region(id, geometry);
    if !status.is_usable() {
        return (checked, status);
    }

    let projected = match transform_region(transform, &checked) {
        Ok(projected) => projected,
        Err(e) => {
            tracing::warn!(region = id, error = %e, "Region could not be reprojected");
            return (MultiPolygon::new(vec![]), GeometryStatus::Unprojectable);
        }
    };

    if projected.is_valid() {
        return (projected, status);
    }

    // Reprojection can fold a ring that was valid in the source CRS; the
    // status keeps describing the source geometry
    match repair_region(&projected) {
        Some(repaired) => (repaired, status),
        None => {
            tracing::warn!(region = id, "Reprojected region is invalid and could not be repaired");
            (MultiPolygon::new(vec![]), GeometryStatus::Unprojectable)
        }
    }
}

fn normalize_point(
    id: &str,
    location: Option<&Point<f64>>,
    transform: &dyn CoordTransform,
) -> (Option<Point<f64>>, GeometryStatus) {
    let (checked, status) = check_point(id, location);
    let Some(point) = checked else {
        return (None, status);
    };

    match transform_point(transform, &point) {
        Ok(projected) if projected.x().is_finite() && projected.y().is_finite() => {
            (Some(projected), status)
        }
        Ok(_) => {
            tracing::debug!(point = id, "Projected location is not finite");
            (None, GeometryStatus::Unprojectable)
        }
        Err(e) => {
            tracing::debug!(point = id, error = %e, "Point could not be reprojected");
            (None, GeometryStatus::Unprojectable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Identity;
    use geo::{polygon, Coord};
    use geotally_core::error::{GeotallyError, Result};
    use geotally_core::models::{Crs, Region, StorePoint};

    /// Fails for coordinates east of a meridian
    struct FailsEastOf(f64);

    impl CoordTransform for FailsEastOf {
        fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
            if coord.x > self.0 {
                Err(GeotallyError::InvalidGeometry {
                    feature_id: "test".to_string(),
                    reason: "outside projection area".to_string(),
                })
            } else {
                Ok(coord)
            }
        }
    }

    fn square(x0: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: 0.0),
            (x: x0 + 10.0, y: 0.0),
            (x: x0 + 10.0, y: 10.0),
            (x: x0, y: 10.0),
            (x: x0, y: 0.0),
        ]])
    }

    #[test]
    fn test_regions_keep_alignment() {
        let table = RegionTable::new(
            Crs::web_mercator(),
            vec![
                Region::new("A", square(0.0)),
                Region::new("B", MultiPolygon::new(vec![])),
                Region::new("C", square(100.0)),
            ],
        );

        let normalized = normalize_regions(&RunContext::default(), &table, &FailsEastOf(50.0));

        assert_eq!(normalized.geometries.len(), 3);
        assert_eq!(
            normalized.statuses,
            vec![GeometryStatus::Valid, GeometryStatus::Missing, GeometryStatus::Unprojectable]
        );
        assert!(normalized.geometries[2].0.is_empty());
        assert_eq!(normalized.summary.valid_after(), 1);
        // A projection failure is not an invalid source geometry
        assert_eq!(normalized.summary.invalid_before(), 0);
        assert_eq!(normalized.summary.unprojectable, 1);
    }

    #[test]
    fn test_points_keep_alignment() {
        let table = PointTable::new(
            Crs::web_mercator(),
            vec![
                StorePoint::new("a", Some(Point::new(1.0, 1.0))),
                StorePoint::new("b", None),
                StorePoint::new("c", Some(Point::new(f64::NAN, 1.0))),
                StorePoint::new("d", Some(Point::new(99.0, 1.0))),
            ],
        );

        let normalized = normalize_points(&RunContext::default(), &table, &FailsEastOf(50.0));

        assert_eq!(normalized.locations, vec![Some(Point::new(1.0, 1.0)), None, None, None]);
        assert_eq!(
            normalized.statuses,
            vec![
                GeometryStatus::Valid,
                GeometryStatus::Missing,
                GeometryStatus::Degenerate,
                GeometryStatus::Unprojectable,
            ]
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let table = RegionTable::new(Crs::web_mercator(), vec![Region::new("A", square(0.0))]);
        let ctx = RunContext::default();

        let once = normalize_regions(&ctx, &table, &Identity);
        let again = RegionTable::new(
            Crs::web_mercator(),
            vec![Region::new("A", once.geometries[0].clone())],
        );
        let twice = normalize_regions(&ctx, &again, &Identity);

        assert_eq!(once.geometries, twice.geometries);
        assert_eq!(twice.statuses, vec![GeometryStatus::Valid]);
    }
}
