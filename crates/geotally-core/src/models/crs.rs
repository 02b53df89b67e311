//! Coordinate reference systems attached to geometry tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// WGS 84 (EPSG:4326), the lon/lat display CRS
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// Web Mercator (EPSG:3857), the global metric fallback
    pub fn web_mercator() -> Self {
        Self::new(3857, "Web Mercator")
    }

    /// Mexico ITRF2008 / LCC (EPSG:6372), the default national metric projection
    pub fn mexico_lcc() -> Self {
        Self::new(6372, "Mexico ITRF2008 / LCC")
    }

    /// Build a CRS from an EPSG code, naming the ones we know about
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            3857 => Self::web_mercator(),
            6372 => Self::mexico_lcc(),
            other => Self::new(other, format!("EPSG:{}", other)),
        }
    }

    /// Authority string understood by PROJ, e.g. `EPSG:4326`
    pub fn authority(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// Two CRS are the same when their EPSG codes match
    pub fn matches(&self, other: &Crs) -> bool {
        self.epsg == other.epsg
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{} ({})", self.epsg, self.name)
    }
}
