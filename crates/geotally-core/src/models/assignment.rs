//! The point-to-region assignment table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a point ended up in its region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentMethod {
    /// The point intersects the region's buffered boundary
    Containment,
    /// No buffered boundary matched; the region centroid is the closest
    NearestCentroid,
    /// The point had no usable geometry and was given the default region
    DefaultRegion,
}

impl AssignmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMethod::Containment => "containment",
            AssignmentMethod::NearestCentroid => "nearest-centroid",
            AssignmentMethod::DefaultRegion => "default-region",
        }
    }

    /// False for the degenerate fallback, which is not a geometric result
    pub fn is_geometric(&self) -> bool {
        !matches!(self, AssignmentMethod::DefaultRegion)
    }
}

impl fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for a point whose buffered-region test matches several regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Prefer regions whose unbuffered polygon contains the point, then the
    /// nearest centroid, then canonical region order
    #[default]
    ContainmentThenCentroid,
    /// First match in canonical region order
    FirstMatch,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::ContainmentThenCentroid => "containment-then-centroid",
            TieBreak::FirstMatch => "first-match",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point's region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub point_id: String,
    /// Index into the region table's canonical order
    pub region_index: usize,
    pub region_id: String,
    pub method: AssignmentMethod,
    /// Number of buffered regions the point intersected (0 unless `Containment`)
    pub candidates: usize,
}

impl Assignment {
    /// True when the containment test matched more than one region
    pub fn was_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Assignments aligned with the input point order, one per point
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssignmentTable {
    entries: Vec<Assignment>,
}

impl AssignmentTable {
    pub fn from_entries(entries: Vec<Assignment>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Assignment] {
        &self.entries
    }

    /// Assignment of the point at `index` in the input order
    pub fn get(&self, index: usize) -> Option<&Assignment> {
        self.entries.get(index)
    }

    /// Region id of the first point with the given id
    pub fn region_of(&self, point_id: &str) -> Option<&str> {
        self.entries.iter().find(|a| a.point_id == point_id).map(|a| a.region_id.as_str())
    }

    pub fn count_by_method(&self, method: AssignmentMethod) -> usize {
        self.entries.iter().filter(|a| a.method == method).count()
    }

    pub fn ambiguous_count(&self) -> usize {
        self.entries.iter().filter(|a| a.was_ambiguous()).count()
    }

    /// Point id to region id
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.iter().map(|a| (a.point_id.clone(), a.region_id.clone())).collect()
    }
}

impl<'a> IntoIterator for &'a AssignmentTable {
    type Item = &'a Assignment;
    type IntoIter = std::slice::Iter<'a, Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
