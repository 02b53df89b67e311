//! CRS transformation and target CRS resolution

use crate::context::RunContext;
use geo::{Coord, MapCoords, MultiPolygon, Point};
use geotally_core::error::{GeotallyError, Result};
use geotally_core::models::Crs;
use proj::Proj;

/// Converts single coordinates from one CRS into another
pub trait CoordTransform {
    fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>>;
}

/// Transform used when source and target CRS are the same
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl CoordTransform for Identity {
    fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        Ok(coord)
    }
}

impl CoordTransform for Proj {
    fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let (x, y) = Proj::convert(self, (coord.x, coord.y)).map_err(|e| {
            GeotallyError::InvalidGeometry {
                feature_id: format!("({}, {})", coord.x, coord.y),
                reason: format!("Projection failed: {}", e),
            }
        })?;
        Ok(Coord { x, y })
    }
}

/// Builds coordinate transforms between two CRS
pub trait ProjectionSource {
    fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>>;
}

/// Projection source backed by the PROJ library
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjLibrary;

impl ProjectionSource for ProjLibrary {
    fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>> {
        // If CRS are the same, no transformation needed
        if from.matches(to) {
            return Ok(Box::new(Identity));
        }

        let from_proj = from.authority();
        let to_proj = to.authority();

        let proj = Proj::new_known_crs(&from_proj, &to_proj, None).map_err(|e| {
            GeotallyError::ProjectionUnavailable {
                from: from_proj.clone(),
                to: to_proj.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Box::new(proj))
    }
}

/// The CRS every comparison runs in, with one transform per source table
pub struct TargetProjection {
    pub crs: Crs,
    /// True when the preferred CRS could not be built and the fallback is in use
    pub fell_back: bool,
    /// Aligned with the source CRS list the projection was resolved for
    pub transforms: Vec<Box<dyn CoordTransform>>,
}

/// Pick the shared metric CRS for a set of source tables.
///
/// The preferred target is used when a transform can be built from every
/// source. Otherwise the fallback is tried for all of them; if that fails
/// too the run cannot continue.
pub fn resolve_target(
    ctx: &RunContext,
    projections: &dyn ProjectionSource,
    sources: &[&Crs],
) -> Result<TargetProjection> {
    let _guard = ctx.span().enter();
    let settings = ctx.settings();

    match build_all(projections, sources, &settings.target_crs) {
        Ok(transforms) => {
            tracing::info!(crs = %settings.target_crs, "Using preferred target CRS");
            Ok(TargetProjection { crs: settings.target_crs.clone(), fell_back: false, transforms })
        }
        Err(e) => {
            tracing::warn!(
                preferred = %settings.target_crs,
                fallback = %settings.fallback_crs,
                error = %e,
                "Preferred projection unavailable, falling back"
            );
            let transforms = build_all(projections, sources, &settings.fallback_crs)?;
            Ok(TargetProjection { crs: settings.fallback_crs.clone(), fell_back: true, transforms })
        }
    }
}

fn build_all(
    projections: &dyn ProjectionSource,
    sources: &[&Crs],
    target: &Crs,
) -> Result<Vec<Box<dyn CoordTransform>>> {
    sources.iter().map(|from| projections.transform(from, target)).collect()
}

/// Reproject a point
pub fn transform_point(transform: &dyn CoordTransform, point: &Point<f64>) -> Result<Point<f64>> {
    transform.convert(point.0).map(Point)
}

/// Reproject a boundary, failing on the first coordinate that cannot be converted
pub fn transform_region(
    transform: &dyn CoordTransform,
    geometry: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>> {
    geometry.try_map_coords(|coord| transform.convert(coord))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    /// Shifts x by a constant and refuses one EPSG code as a target
    struct Shifting {
        dx: f64,
        refuse: u32,
    }

    struct Shift(f64);

    impl CoordTransform for Shift {
        fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
            Ok(Coord { x: coord.x + self.0, y: coord.y })
        }
    }

    impl ProjectionSource for Shifting {
        fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>> {
            if to.epsg == self.refuse {
                return Err(GeotallyError::ProjectionUnavailable {
                    from: from.authority(),
                    to: to.authority(),
                    reason: "refused".to_string(),
                });
            }
            if from.matches(to) {
                Ok(Box::new(Identity))
            } else {
                Ok(Box::new(Shift(self.dx)))
            }
        }
    }

    #[test]
    fn test_proj_library_identity_for_same_crs() {
        let transform = ProjLibrary.transform(&Crs::web_mercator(), &Crs::web_mercator()).unwrap();
        let p = transform_point(transform.as_ref(), &Point::new(1234.5, -42.0)).unwrap();
        assert_eq!(p, Point::new(1234.5, -42.0));
    }

    #[test]
    fn test_transform_region_maps_every_coordinate() {
        let geometry = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        let shifted = transform_region(&Shift(10.0), &geometry).unwrap();
        let xs: Vec<f64> = shifted.0[0].exterior().0.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![10.0, 11.0, 11.0, 10.0]);
    }

    #[test]
    fn test_resolve_prefers_target() {
        let ctx = RunContext::default();
        let source = Shifting { dx: 1.0, refuse: 0 };
        let wgs84 = Crs::wgs84();

        let target = resolve_target(&ctx, &source, &[&wgs84, &wgs84]).unwrap();
        assert_eq!(target.crs, Crs::mexico_lcc());
        assert!(!target.fell_back);
        assert_eq!(target.transforms.len(), 2);
    }

    #[test]
    fn test_resolve_falls_back() {
        let ctx = RunContext::default();
        let source = Shifting { dx: 1.0, refuse: 6372 };
        let wgs84 = Crs::wgs84();

        let target = resolve_target(&ctx, &source, &[&wgs84]).unwrap();
        assert_eq!(target.crs, Crs::web_mercator());
        assert!(target.fell_back);
    }

    #[test]
    fn test_resolve_fails_when_fallback_fails() {
        let mut settings = geotally_core::config::AssignSettings::default();
        settings.fallback_crs = Crs::mexico_lcc();
        let ctx = RunContext::new(settings);
        let source = Shifting { dx: 1.0, refuse: 6372 };
        let wgs84 = Crs::wgs84();

        let result = resolve_target(&ctx, &source, &[&wgs84]);
        assert!(matches!(result, Err(GeotallyError::ProjectionUnavailable { .. })));
    }
}
