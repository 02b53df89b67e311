//! Retail-location records and the point geometry table.

use geo::Point;
use serde_json::{Map, Value};

use super::Crs;

/// A retail location. Only `location` matters to the assignment algorithm;
/// the rest is carried through to the output untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePoint {
    pub id: String,
    /// Lon/lat (or source CRS) coordinate, `None` when missing in the source
    pub location: Option<Point<f64>>,
    pub name: String,
    pub address: Option<String>,
    pub properties: Map<String, Value>,
}

impl StorePoint {
    pub fn new(id: impl Into<String>, location: Option<Point<f64>>) -> Self {
        Self {
            id: id.into(),
            location,
            name: String::new(),
            address: None,
            properties: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// True when the point carries a non-blank address
    pub fn has_address(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// Ordered point records sharing one CRS
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointTable {
    pub crs: Crs,
    pub points: Vec<StorePoint>,
}

impl PointTable {
    pub fn new(crs: Crs, points: Vec<StorePoint>) -> Self {
        Self { crs, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_address() {
        let p = StorePoint::new("p1", None);
        assert!(!p.has_address());
        assert!(!p.clone().with_address("   ").has_address());
        assert!(p.with_address("Av. Insurgentes Sur 1602").has_address());
    }
}
