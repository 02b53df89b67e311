//! Per-region categorical and electoral attributes.
//!
//! The table is structured configuration (TOML) keyed by region name:
//!
//! ```toml
//! [regions."BENITO JUAREZ"]
//! winning_party = "PAN"
//! total_votes = 320000
//! vote_share = 41.2
//! ```
//!
//! Keys go through [`normalize_key`] on load and on lookup, so the table and
//! the region file only need to agree up to case, accents and whitespace.
//! Names that differ in more than that are listed under `aliases`:
//!
//! ```toml
//! [regions.CUAJIMALPA]
//! aliases = ["Cuajimalpa de Morelos"]
//! winning_party = "PAN"
//! total_votes = 150000
//! ```

use crate::error::{GeotallyError, Result};
use crate::models::{normalize_key, RegionTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Electoral record attached to one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAttributes {
    pub winning_party: String,
    pub total_votes: u64,
    /// Winner's share of the vote, in percent
    #[serde(default)]
    pub vote_share: f64,
    /// Participation rate, in percent
    #[serde(default)]
    pub turnout: Option<f64>,
    /// Enclosing region, e.g. the borough an electoral district belongs to
    #[serde(default)]
    pub parent: Option<String>,
    /// Other names the region goes by in boundary files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AttributeFile {
    #[serde(default)]
    regions: BTreeMap<String, RegionAttributes>,
}

/// Lookup from normalized region key to its attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    records: BTreeMap<String, RegionAttributes>,
    /// Normalized alias to record key
    aliases: BTreeMap<String, String>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GeotallyError::MissingInput { path: path.to_path_buf() },
            _ => GeotallyError::Io(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: AttributeFile = toml::from_str(content).map_err(|e| GeotallyError::ConfigInvalid {
            key: "attributes".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })?;

        let mut table = Self::new();
        for (name, attributes) in file.regions {
            let key = normalize_key(&name);
            if table.records.contains_key(&key) {
                return Err(duplicate_key(&key));
            }
            table.records.insert(key, attributes);
        }

        let aliases: Vec<(String, String)> = table
            .records
            .iter()
            .flat_map(|(key, record)| {
                record.aliases.iter().map(move |alias| (normalize_key(alias), key.clone()))
            })
            .collect();
        for (alias, key) in aliases {
            if alias == key {
                continue;
            }
            if table.records.contains_key(&alias) || table.aliases.contains_key(&alias) {
                return Err(duplicate_key(&alias));
            }
            table.aliases.insert(alias, key);
        }

        Ok(table)
    }

    pub fn insert(&mut self, region: &str, attributes: RegionAttributes) {
        let key = normalize_key(region);
        for alias in &attributes.aliases {
            self.aliases.insert(normalize_key(alias), key.clone());
        }
        self.records.insert(key, attributes);
    }

    pub fn get(&self, region: &str) -> Option<&RegionAttributes> {
        self.resolve(region).and_then(|key| self.records.get(key))
    }

    /// Record key a region name resolves to, directly or through an alias
    fn resolve(&self, region: &str) -> Option<&str> {
        let key = normalize_key(region);
        if let Some((key, _)) = self.records.get_key_value(&key) {
            return Some(key.as_str());
        }
        self.aliases.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Check that every region has a record. Records for unknown regions are
    /// only worth a warning.
    pub fn validate_against(&self, regions: &RegionTable) -> Result<()> {
        let missing: Vec<String> =
            regions.ids().filter(|id| self.get(id).is_none()).map(str::to_string).collect();

        let matched: Vec<&str> = regions.ids().filter_map(|id| self.resolve(id)).collect();
        let extra: Vec<&str> = self.keys().filter(|k| !matched.contains(k)).collect();
        if !extra.is_empty() {
            tracing::warn!(
                extra = extra.len(),
                "Attribute records without a matching region: {}",
                extra.join(", ")
            );
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GeotallyError::AttributesIncomplete { missing })
        }
    }
}

fn duplicate_key(key: &str) -> GeotallyError {
    GeotallyError::ConfigInvalid {
        key: "attributes".to_string(),
        reason: format!("Duplicate region key after normalization: {}", key),
    }
}
