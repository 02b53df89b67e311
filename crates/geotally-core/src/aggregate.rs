//! Per-region counts and cross-tabulation over a finished assignment.
//!
//! Everything here is a pure function of the assignment table, the point
//! records and the region order; no geometry is touched.

use crate::attributes::{AttributeTable, RegionAttributes};
use crate::models::{AssignmentTable, RegionTable, StorePoint};
use serde::Serialize;
use std::collections::BTreeMap;

/// Party label for regions without an attribute record
pub const NO_DATA_PARTY: &str = "No data";

/// Points assigned to one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCount {
    pub region_id: String,
    pub point_count: usize,
    /// Points with a non-blank address
    pub address_count: usize,
}

/// Count assigned points per region, in canonical region order. Regions
/// nobody was assigned to are present with a count of zero.
pub fn count_by_region(
    regions: &RegionTable,
    points: &[StorePoint],
    assignments: &AssignmentTable,
) -> Vec<RegionCount> {
    let mut counts: Vec<RegionCount> = regions
        .ids()
        .map(|id| RegionCount { region_id: id.to_string(), point_count: 0, address_count: 0 })
        .collect();

    for (point, assignment) in points.iter().zip(assignments) {
        let Some(count) = counts.get_mut(assignment.region_index) else {
            continue;
        };
        count.point_count += 1;
        if point.has_address() {
            count.address_count += 1;
        }
    }

    counts
}

/// A region's counts joined with its attribute record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region_id: String,
    pub point_count: usize,
    pub address_count: usize,
    pub attributes: Option<RegionAttributes>,
}

impl RegionSummary {
    pub fn party(&self) -> &str {
        self.attributes.as_ref().map(|a| a.winning_party.as_str()).unwrap_or(NO_DATA_PARTY)
    }
}

/// Left-join counts with the attribute table
pub fn join_attributes(
    counts: Vec<RegionCount>,
    attributes: Option<&AttributeTable>,
) -> Vec<RegionSummary> {
    counts
        .into_iter()
        .map(|c| RegionSummary {
            attributes: attributes.and_then(|t| t.get(&c.region_id)).cloned(),
            region_id: c.region_id,
            point_count: c.point_count,
            address_count: c.address_count,
        })
        .collect()
}

/// Totals for the regions won by one party
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartySummary {
    pub party: String,
    pub regions: usize,
    pub points: usize,
    pub mean_points: f64,
    pub total_votes: u64,
    /// Mean over the regions that report a turnout
    pub mean_turnout: Option<f64>,
}

/// Cross-tabulate point counts by winning party, ordered by party name
pub fn party_breakdown(summaries: &[RegionSummary]) -> Vec<PartySummary> {
    let mut groups: BTreeMap<&str, Vec<&RegionSummary>> = BTreeMap::new();
    for summary in summaries {
        groups.entry(summary.party()).or_default().push(summary);
    }

    groups
        .into_iter()
        .map(|(party, members)| {
            let points: usize = members.iter().map(|s| s.point_count).sum();
            let total_votes = members
                .iter()
                .filter_map(|s| s.attributes.as_ref())
                .map(|a| a.total_votes)
                .sum();
            let turnouts: Vec<f64> = members
                .iter()
                .filter_map(|s| s.attributes.as_ref().and_then(|a| a.turnout))
                .collect();
            let mean_turnout = if turnouts.is_empty() {
                None
            } else {
                Some(turnouts.iter().sum::<f64>() / turnouts.len() as f64)
            };

            PartySummary {
                party: party.to_string(),
                regions: members.len(),
                points,
                mean_points: points as f64 / members.len() as f64,
                total_votes,
                mean_turnout,
            }
        })
        .collect()
}

/// Descriptive statistics of the per-region counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountStats {
    pub regions: usize,
    pub total: usize,
    pub mean: f64,
    pub median: f64,
    pub min: usize,
    pub max: usize,
}

impl CountStats {
    /// `None` when there are no regions
    pub fn from_counts(counts: &[RegionCount]) -> Option<Self> {
        if counts.is_empty() {
            return None;
        }

        let mut values: Vec<usize> = counts.iter().map(|c| c.point_count).collect();
        values.sort_unstable();

        let n = values.len();
        let total: usize = values.iter().sum();
        let median = if n % 2 == 1 {
            values[n / 2] as f64
        } else {
            (values[n / 2 - 1] + values[n / 2]) as f64 / 2.0
        };

        Some(Self {
            regions: n,
            total,
            mean: total as f64 / n as f64,
            median,
            min: values[0],
            max: values[n - 1],
        })
    }
}

/// Regions ordered by point count, highest first; equal counts keep canonical order
pub fn rank_by_count(summaries: &[RegionSummary]) -> Vec<&RegionSummary> {
    let mut ranked: Vec<&RegionSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| b.point_count.cmp(&a.point_count));
    ranked
}

/// Regions ordered by point count, lowest first; equal counts keep canonical order
pub fn rank_by_count_ascending(summaries: &[RegionSummary]) -> Vec<&RegionSummary> {
    let mut ranked: Vec<&RegionSummary> = summaries.iter().collect();
    ranked.sort_by_key(|s| s.point_count);
    ranked
}

/// Totals for the regions that share one enclosing region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentRollup {
    pub parent: String,
    pub regions: usize,
    pub points: usize,
}

/// Roll region counts up to their `parent` attribute, ordered by parent
/// name. Regions without a parent are left out.
pub fn rollup_by_parent(summaries: &[RegionSummary]) -> Vec<ParentRollup> {
    let mut groups: BTreeMap<&str, ParentRollup> = BTreeMap::new();
    for summary in summaries {
        let Some(parent) = summary.attributes.as_ref().and_then(|a| a.parent.as_deref()) else {
            continue;
        };
        let rollup = groups.entry(parent).or_insert_with(|| ParentRollup {
            parent: parent.to_string(),
            regions: 0,
            points: 0,
        });
        rollup.regions += 1;
        rollup.points += summary.point_count;
    }
    groups.into_values().collect()
}
