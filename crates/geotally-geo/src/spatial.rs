//! Buffered containment matching.
//!
//! Each region is expanded by the configured tolerance and indexed by its
//! envelope. A point is matched against the envelopes first and then against
//! the exact buffered geometry.

use geo::{BoundingRect, Buffer, Distance, Euclidean, Intersects, MultiPolygon, Point};
use geotally_core::models::TieBreak;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

type IndexedEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Result of matching one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentMatch {
    /// Chosen region index
    pub region: usize,
    /// Number of buffered regions the point intersected
    pub candidates: usize,
}

impl ContainmentMatch {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Matches points against buffered regions
pub struct ContainmentMatcher<'a> {
    regions: &'a [MultiPolygon<f64>],
    centroids: &'a [Option<Point<f64>>],
    buffered: Vec<MultiPolygon<f64>>,
    index: RTree<IndexedEnvelope>,
    tie_break: TieBreak,
}

impl<'a> ContainmentMatcher<'a> {
    /// Buffer and index the regions. `centroids` must be aligned with `regions`.
    pub fn new(
        regions: &'a [MultiPolygon<f64>],
        centroids: &'a [Option<Point<f64>>],
        buffer_distance: f64,
        tie_break: TieBreak,
    ) -> Self {
        let buffered: Vec<MultiPolygon<f64>> = regions
            .iter()
            .map(|region| {
                if region.0.is_empty() || buffer_distance == 0.0 {
                    region.clone()
                } else {
                    region.buffer(buffer_distance)
                }
            })
            .collect();

        let envelopes: Vec<IndexedEnvelope> = buffered
            .iter()
            .enumerate()
            .filter_map(|(idx, geometry)| {
                let rect = geometry.bounding_rect()?;
                let corners = Rectangle::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                );
                Some(GeomWithData::new(corners, idx))
            })
            .collect();

        tracing::debug!(
            regions = regions.len(),
            indexed = envelopes.len(),
            buffer = buffer_distance,
            "Built containment index"
        );

        Self { regions, centroids, buffered, index: RTree::bulk_load(envelopes), tie_break }
    }

    /// Indices of every buffered region the point intersects, in canonical order
    pub fn candidates(&self, point: &Point<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .index
            .locate_all_at_point(&[point.x(), point.y()])
            .map(|envelope| envelope.data)
            .filter(|idx| self.buffered[*idx].intersects(point))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Match a point, applying the tie-break policy when several regions qualify
    pub fn match_point(&self, point: &Point<f64>) -> Option<ContainmentMatch> {
        let candidates = self.candidates(point);
        let region = match candidates.as_slice() {
            [] => return None,
            [only] => *only,
            [first, ..] => match self.tie_break {
                TieBreak::FirstMatch => *first,
                TieBreak::ContainmentThenCentroid => self.break_tie(point, &candidates),
            },
        };
        Some(ContainmentMatch { region, candidates: candidates.len() })
    }

    /// Unbuffered regions covering the point win; among the remaining pool the
    /// nearest centroid wins; equal distances keep canonical order.
    fn break_tie(&self, point: &Point<f64>, candidates: &[usize]) -> usize {
        let covering: Vec<usize> =
            candidates.iter().copied().filter(|idx| self.regions[*idx].intersects(point)).collect();
        let pool = if covering.is_empty() { candidates } else { covering.as_slice() };

        if let [only] = pool {
            return *only;
        }

        let mut best = pool[0];
        let mut best_distance = self.centroid_distance(best, point);
        for idx in &pool[1..] {
            let distance = self.centroid_distance(*idx, point);
            if distance < best_distance {
                best = *idx;
                best_distance = distance;
            }
        }
        best
    }

    fn centroid_distance(&self, idx: usize, point: &Point<f64>) -> f64 {
        self.centroids
            .get(idx)
            .copied()
            .flatten()
            .map(|centroid| Euclidean.distance(*point, centroid))
            .unwrap_or(f64::INFINITY)
    }
}
