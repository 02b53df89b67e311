//! The region assignment engine.
//!
//! Runs the three stages in order (normalize, buffered containment, nearest
//! centroid with default fallback) and checks that every point ended up with
//! exactly one region.

use crate::context::RunContext;
use crate::nearest::{region_centroids, NearestRegionResolver};
use crate::normalize::{normalize_points, normalize_regions};
use crate::spatial::ContainmentMatcher;
use crate::transform::{resolve_target, ProjLibrary, ProjectionSource};
use crate::validation::NormalizationSummary;
use geotally_core::error::{GeotallyError, Result};
use geotally_core::models::{
    Assignment, AssignmentMethod, AssignmentTable, Crs, PointTable, RegionTable,
};
use serde::Serialize;

/// What happened during one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentReport {
    /// CRS all comparisons ran in
    pub target_crs: Crs,
    pub projection_fallback: bool,
    pub regions: NormalizationSummary,
    pub points: NormalizationSummary,
    pub by_containment: usize,
    pub by_nearest: usize,
    pub by_default: usize,
    /// Points that intersected more than one buffered region
    pub ambiguous: usize,
}

/// Assignment table plus the run report
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub table: AssignmentTable,
    pub report: AssignmentReport,
}

/// Assigns every point to exactly one region
pub struct RegionAssigner {
    projections: Box<dyn ProjectionSource>,
}

impl Default for RegionAssigner {
    fn default() -> Self {
        Self::new(ProjLibrary)
    }
}

impl RegionAssigner {
    pub fn new(projections: impl ProjectionSource + 'static) -> Self {
        Self { projections: Box::new(projections) }
    }

    pub fn assign(
        &self,
        ctx: &RunContext,
        points: &PointTable,
        regions: &RegionTable,
    ) -> Result<AssignmentOutcome> {
        if regions.is_empty() {
            return Err(GeotallyError::EmptyInput { what: "regions".to_string() });
        }

        let target = resolve_target(ctx, self.projections.as_ref(), &[&regions.crs, &points.crs])?;
        let normalized_regions = normalize_regions(ctx, regions, target.transforms[0].as_ref());
        let normalized_points = normalize_points(ctx, points, target.transforms[1].as_ref());

        let _guard = ctx.span().enter();
        let settings = ctx.settings();

        let centroids = region_centroids(&normalized_regions.geometries);
        let matcher = ContainmentMatcher::new(
            &normalized_regions.geometries,
            &centroids,
            settings.buffer_distance,
            settings.tie_break,
        );
        let resolver = NearestRegionResolver::new(&centroids);
        if !resolver.has_candidates() {
            tracing::warn!("No region has a usable centroid; unmatched points go to the default region");
        }

        // Containment pass
        let mut resolved: Vec<Option<(usize, AssignmentMethod, usize)>> = normalized_points
            .locations
            .iter()
            .map(|location| {
                let m = matcher.match_point(location.as_ref()?)?;
                Some((m.region, AssignmentMethod::Containment, m.candidates))
            })
            .collect();

        let by_containment = resolved.iter().flatten().count();
        let ambiguous = resolved.iter().flatten().filter(|(_, _, candidates)| *candidates > 1).count();
        tracing::info!(
            resolved = by_containment,
            ambiguous,
            unresolved = resolved.len() - by_containment,
            "Containment pass complete"
        );

        // Nearest-centroid pass, then the default region
        let mut by_nearest = 0;
        let mut by_default = 0;
        for (slot, location) in resolved.iter_mut().zip(&normalized_points.locations) {
            if slot.is_some() {
                continue;
            }
            match location.as_ref().and_then(|p| resolver.nearest(p)) {
                Some(region) => {
                    *slot = Some((region, AssignmentMethod::NearestCentroid, 0));
                    by_nearest += 1;
                }
                None => {
                    *slot = Some((0, AssignmentMethod::DefaultRegion, 0));
                    by_default += 1;
                }
            }
        }

        tracing::info!(nearest = by_nearest, "Nearest-centroid pass complete");
        if by_default > 0 {
            let default_id = regions.default_region().map(|r| r.id.as_str()).unwrap_or_default();
            tracing::warn!(
                count = by_default,
                region = default_id,
                "Points without usable geometry assigned to the default region"
            );
        }

        let table = build_table(points, regions, resolved)?;
        let ambiguous = table.ambiguous_count();

        Ok(AssignmentOutcome {
            table,
            report: AssignmentReport {
                target_crs: target.crs,
                projection_fallback: target.fell_back,
                regions: normalized_regions.summary,
                points: normalized_points.summary,
                by_containment,
                by_nearest,
                by_default,
                ambiguous,
            },
        })
    }
}

/// Turn resolved slots into the assignment table, failing if any point is
/// still without a valid region
fn build_table(
    points: &PointTable,
    regions: &RegionTable,
    resolved: Vec<Option<(usize, AssignmentMethod, usize)>>,
) -> Result<AssignmentTable> {
    let unresolved = resolved
        .iter()
        .filter(|slot| !matches!(slot, Some((idx, _, _)) if *idx < regions.len()))
        .count();
    if unresolved > 0 || resolved.len() != points.len() {
        return Err(GeotallyError::UnresolvedAssignment {
            count: unresolved + points.len().abs_diff(resolved.len()),
        });
    }

    let entries = points
        .points
        .iter()
        .zip(resolved.into_iter().flatten())
        .map(|(point, (region_index, method, candidates))| Assignment {
            point_id: point.id.clone(),
            region_index,
            region_id: regions.regions[region_index].id.clone(),
            method,
            candidates,
        })
        .collect();

    Ok(AssignmentTable::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon, Point};
    use geotally_core::models::{Region, StorePoint};

    fn metric_regions() -> RegionTable {
        let square = |x0: f64| {
            MultiPolygon::new(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + 1000.0, y: 0.0),
                (x: x0 + 1000.0, y: 1000.0),
                (x: x0, y: 1000.0),
                (x: x0, y: 0.0),
            ]])
        };
        RegionTable::new(
            Crs::web_mercator(),
            vec![Region::new("R1", square(0.0)), Region::new("R2", square(3000.0))],
        )
    }

    fn metric_ctx() -> RunContext {
        let mut settings = geotally_core::config::AssignSettings::default();
        settings.target_crs = Crs::web_mercator();
        settings.buffer_distance = 500.0;
        RunContext::new(settings)
    }

    #[test]
    fn test_empty_regions_rejected() {
        let points = PointTable::new(Crs::web_mercator(), vec![StorePoint::new("p", None)]);
        let regions = RegionTable::new(Crs::web_mercator(), vec![]);
        let err = RegionAssigner::default().assign(&metric_ctx(), &points, &regions).unwrap_err();
        assert!(matches!(err, GeotallyError::EmptyInput { .. }));
    }

    #[test]
    fn test_every_method_is_reported() {
        let points = PointTable::new(
            Crs::web_mercator(),
            vec![
                StorePoint::new("in", Some(Point::new(500.0, 500.0))),
                StorePoint::new("far", Some(Point::new(3500.0, 9000.0))),
                StorePoint::new("none", None),
            ],
        );

        let outcome =
            RegionAssigner::default().assign(&metric_ctx(), &points, &metric_regions()).unwrap();

        let methods: Vec<AssignmentMethod> = outcome.table.iter().map(|a| a.method).collect();
        assert_eq!(
            methods,
            vec![
                AssignmentMethod::Containment,
                AssignmentMethod::NearestCentroid,
                AssignmentMethod::DefaultRegion,
            ]
        );
        assert_eq!(outcome.table.region_of("far"), Some("R2"));
        assert_eq!(outcome.table.region_of("none"), Some("R1"));
        assert_eq!(outcome.report.by_containment, 1);
        assert_eq!(outcome.report.by_nearest, 1);
        assert_eq!(outcome.report.by_default, 1);
        assert_eq!(outcome.report.points.missing, 1);
        assert!(!outcome.report.projection_fallback);
    }

    #[test]
    fn test_build_table_rejects_unresolved() {
        let points = PointTable::new(
            Crs::web_mercator(),
            vec![StorePoint::new("a", None), StorePoint::new("b", None)],
        );
        let resolved = vec![Some((0, AssignmentMethod::DefaultRegion, 0)), None];

        let err = build_table(&points, &metric_regions(), resolved).unwrap_err();
        assert!(matches!(err, GeotallyError::UnresolvedAssignment { count: 1 }));

        let out_of_range = vec![
            Some((0, AssignmentMethod::DefaultRegion, 0)),
            Some((9, AssignmentMethod::NearestCentroid, 0)),
        ];
        assert!(build_table(&points, &metric_regions(), out_of_range).is_err());
    }
}
