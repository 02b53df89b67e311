//! Nearest-centroid fallback for points outside every buffered region.

use geo::{Centroid, Distance, Euclidean, MultiPolygon, Point};

/// Centroid of every region, `None` for empty or degenerate boundaries
pub fn region_centroids(regions: &[MultiPolygon<f64>]) -> Vec<Option<Point<f64>>> {
    regions.iter().map(|region| region.centroid()).collect()
}

/// Resolves points that matched no buffered region
#[derive(Debug, Clone, Copy)]
pub struct NearestRegionResolver<'a> {
    centroids: &'a [Option<Point<f64>>],
}

impl<'a> NearestRegionResolver<'a> {
    pub fn new(centroids: &'a [Option<Point<f64>>]) -> Self {
        Self { centroids }
    }

    /// True when at least one region has a centroid to measure against
    pub fn has_candidates(&self) -> bool {
        self.centroids.iter().any(Option::is_some)
    }

    /// Index of the region whose centroid is closest to `point`.
    ///
    /// Ties keep the earliest region in canonical order. `None` only when no
    /// region has a centroid.
    pub fn nearest(&self, point: &Point<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (idx, centroid) in self.centroids.iter().enumerate() {
            let Some(centroid) = centroid else {
                continue;
            };
            let distance = Euclidean.distance(*point, *centroid);
            if !distance.is_finite() {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((idx, distance)),
            }
        }

        best.map(|(idx, _)| idx)
    }
}
