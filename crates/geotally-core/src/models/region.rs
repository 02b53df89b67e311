//! Administrative and electoral boundaries.

use geo::MultiPolygon;
use serde_json::{Map, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::Crs;

/// Normalize a region name into a lookup key: accents folded, periods
/// dropped, inner whitespace collapsed, upper-cased.
///
/// `"Gustavo A. Madero"` and `"GUSTAVO A MADERO"` share a key, as do
/// `"Benito Juárez"` and `"BENITO JUAREZ"`.
pub fn normalize_key(name: &str) -> String {
    let folded: String = name.nfd().filter(|c| !is_combining_mark(*c) && *c != '.').collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// An administrative or electoral boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    /// Empty when the source geometry was missing or not polygonal
    pub geometry: MultiPolygon<f64>,
    pub properties: Map<String, Value>,
}

impl Region {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self { id: id.into(), geometry, properties: Map::new() }
    }
}

/// Regions in canonical order sharing one CRS. The first region is the
/// default target for points that cannot be placed geometrically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionTable {
    pub crs: Crs,
    pub regions: Vec<Region>,
}

impl RegionTable {
    pub fn new(crs: Crs, regions: Vec<Region>) -> Self {
        Self { crs, regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.id.as_str())
    }

    /// Index of the region with the given id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.id == id)
    }

    /// The region used when nothing else applies
    pub fn default_region(&self) -> Option<&Region> {
        self.regions.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Gustavo A  Madero "), "GUSTAVO A MADERO");
        assert_eq!(normalize_key("tlalpan"), "TLALPAN");
    }

    #[test]
    fn test_normalize_key_folds_accents() {
        assert_eq!(normalize_key("Benito Juárez"), "BENITO JUAREZ");
        assert_eq!(normalize_key("Álvaro Obregón"), "ALVARO OBREGON");
        assert_eq!(normalize_key("Tláhuac"), "TLAHUAC");
        assert_eq!(normalize_key("Gustavo A. Madero"), "GUSTAVO A MADERO");
        assert_eq!(normalize_key("Cuauhtémoc"), normalize_key("CUAUHTEMOC"));
    }

    #[test]
    fn test_default_region_is_first() {
        let table = RegionTable::new(
            Crs::wgs84(),
            vec![
                Region::new("R1", MultiPolygon::new(vec![])),
                Region::new("R2", MultiPolygon::new(vec![])),
            ],
        );
        assert_eq!(table.default_region().map(|r| r.id.as_str()), Some("R1"));
        assert_eq!(table.position("R2"), Some(1));
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["R1", "R2"]);
    }
}
