use crate::error::{GeotallyError, Result};
use crate::models::{Crs, TieBreak};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Default tolerance, in metric CRS units, by which region boundaries are expanded
pub const DEFAULT_BUFFER_DISTANCE: f64 = 1000.0;

/// Property names tried, in order, for a region's identifier
pub const DEFAULT_REGION_ID_FIELDS: &[&str] = &["nomgeo", "nombre", "alcaldia", "distrito", "name"];

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Settings the assignment engine runs with, resolved from a [`LayeredConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct AssignSettings {
    /// Preferred metric CRS for all comparisons
    pub target_crs: Crs,
    /// Used when the preferred projection cannot be built
    pub fallback_crs: Crs,
    /// Region boundary expansion, in target CRS units
    pub buffer_distance: f64,
    pub tie_break: TieBreak,
}

impl Default for AssignSettings {
    fn default() -> Self {
        Self {
            target_crs: Crs::mexico_lcc(),
            fallback_crs: Crs::web_mercator(),
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            tie_break: TieBreak::default(),
        }
    }
}

/// Layered configuration for Geotally
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub target_crs: ConfigValue<u32>,
    pub fallback_crs: ConfigValue<u32>,
    pub buffer_distance: ConfigValue<f64>,
    pub tie_break: ConfigValue<TieBreak>,
    pub region_id_fields: ConfigValue<Vec<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let defaults = AssignSettings::default();
        Self {
            target_crs: ConfigValue::new(defaults.target_crs.epsg, ConfigSource::Default),
            fallback_crs: ConfigValue::new(defaults.fallback_crs.epsg, ConfigSource::Default),
            buffer_distance: ConfigValue::new(defaults.buffer_distance, ConfigSource::Default),
            tie_break: ConfigValue::new(defaults.tie_break, ConfigSource::Default),
            region_id_fields: ConfigValue::new(
                DEFAULT_REGION_ID_FIELDS.iter().map(|f| f.to_string()).collect(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GeotallyError::MissingInput { path: path.to_path_buf() },
            _ => GeotallyError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            },
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeotallyError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(crs) = file_config.target_crs {
            self.target_crs.update(crs, ConfigSource::File);
        }

        if let Some(crs) = file_config.fallback_crs {
            self.fallback_crs.update(crs, ConfigSource::File);
        }

        if let Some(distance) = file_config.buffer_distance {
            check_buffer_distance(distance)?;
            self.buffer_distance.update(distance, ConfigSource::File);
        }

        if let Some(tie_break) = file_config.tie_break {
            self.tie_break.update(tie_break, ConfigSource::File);
        }

        if let Some(fields) = file_config.region_id_fields {
            if fields.is_empty() {
                return Err(GeotallyError::ConfigInvalid {
                    key: "region_id_fields".to_string(),
                    reason: "at least one field name is required".to_string(),
                });
            }
            self.region_id_fields.update(fields, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOTALLY_TARGET_CRS
        if let Ok(crs_str) = env::var("GEOTALLY_TARGET_CRS") {
            match parse_epsg(&crs_str) {
                Ok(crs) => self.target_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOTALLY_TARGET_CRS value '{}': expected EPSG code",
                    crs_str
                ),
            }
        }

        // GEOTALLY_FALLBACK_CRS
        if let Ok(crs_str) = env::var("GEOTALLY_FALLBACK_CRS") {
            match parse_epsg(&crs_str) {
                Ok(crs) => self.fallback_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOTALLY_FALLBACK_CRS value '{}': expected EPSG code",
                    crs_str
                ),
            }
        }

        // GEOTALLY_BUFFER_DISTANCE
        if let Ok(distance_str) = env::var("GEOTALLY_BUFFER_DISTANCE") {
            match parse_buffer_distance(&distance_str) {
                Ok(distance) => self.buffer_distance.update(distance, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOTALLY_BUFFER_DISTANCE value '{}': expected a non-negative number",
                    distance_str
                ),
            }
        }

        // GEOTALLY_TIE_BREAK
        if let Ok(policy_str) = env::var("GEOTALLY_TIE_BREAK") {
            match parse_tie_break(&policy_str) {
                Ok(policy) => self.tie_break.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOTALLY_TIE_BREAK value '{}': expected containment-then-centroid or first-match",
                    policy_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(crs) = overrides.target_crs {
            self.target_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(crs) = overrides.fallback_crs {
            self.fallback_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(distance) = overrides.buffer_distance {
            self.buffer_distance.update(distance, ConfigSource::Cli);
        }

        if let Some(tie_break) = overrides.tie_break {
            self.tie_break.update(tie_break, ConfigSource::Cli);
        }
    }

    /// Resolve the engine settings
    pub fn settings(&self) -> AssignSettings {
        AssignSettings {
            target_crs: Crs::from_epsg(self.target_crs.value),
            fallback_crs: Crs::from_epsg(self.fallback_crs.value),
            buffer_distance: self.buffer_distance.value,
            tie_break: self.tie_break.value,
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> BTreeMap<String, (String, ConfigSource)> {
        let mut map = BTreeMap::new();

        map.insert(
            "target_crs".to_string(),
            (Crs::from_epsg(self.target_crs.value).to_string(), self.target_crs.source),
        );

        map.insert(
            "fallback_crs".to_string(),
            (Crs::from_epsg(self.fallback_crs.value).to_string(), self.fallback_crs.source),
        );

        map.insert(
            "buffer_distance".to_string(),
            (self.buffer_distance.value.to_string(), self.buffer_distance.source),
        );

        map.insert(
            "tie_break".to_string(),
            (self.tie_break.value.to_string(), self.tie_break.source),
        );

        map.insert(
            "region_id_fields".to_string(),
            (self.region_id_fields.value.join(", "), self.region_id_fields.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    target_crs: Option<u32>,
    fallback_crs: Option<u32>,
    buffer_distance: Option<f64>,
    tie_break: Option<TieBreak>,
    region_id_fields: Option<Vec<String>>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub target_crs: Option<u32>,
    pub fallback_crs: Option<u32>,
    pub buffer_distance: Option<f64>,
    pub tie_break: Option<TieBreak>,
}

/// Parse an EPSG code, accepting `6372` or `EPSG:6372`
pub fn parse_epsg(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("EPSG:")
        .or_else(|| trimmed.strip_prefix("epsg:"))
        .unwrap_or(trimmed);
    digits.parse::<u32>().map_err(|_| GeotallyError::ConfigInvalid {
        key: "crs".to_string(),
        reason: format!("Invalid EPSG code: {}", s),
    })
}

/// Parse a buffer distance, rejecting negative and non-finite values
pub fn parse_buffer_distance(s: &str) -> Result<f64> {
    let distance = s.trim().parse::<f64>().map_err(|_| GeotallyError::ConfigInvalid {
        key: "buffer_distance".to_string(),
        reason: format!("Invalid buffer distance: {}", s),
    })?;
    check_buffer_distance(distance)?;
    Ok(distance)
}

/// Reject negative and non-finite buffer distances
pub fn check_buffer_distance(distance: f64) -> Result<()> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(())
    } else {
        Err(GeotallyError::ConfigInvalid {
            key: "buffer_distance".to_string(),
            reason: format!("Buffer distance must be finite and non-negative, got {}", distance),
        })
    }
}

/// Parse tie-break policy from string
pub fn parse_tie_break(s: &str) -> Result<TieBreak> {
    match s.to_lowercase().replace('_', "-").as_str() {
        "containment-then-centroid" | "containment" => Ok(TieBreak::ContainmentThenCentroid),
        "first-match" | "first" => Ok(TieBreak::FirstMatch),
        _ => Err(GeotallyError::ConfigInvalid {
            key: "tie_break".to_string(),
            reason: format!(
                "Invalid tie-break policy: {}. Use containment-then-centroid or first-match",
                s
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.target_crs.value, 6372);
        assert_eq!(config.target_crs.source, ConfigSource::Default);
        assert_eq!(config.fallback_crs.value, 3857);
        assert_eq!(config.buffer_distance.value, 1000.0);
        assert_eq!(config.tie_break.value, TieBreak::ContainmentThenCentroid);
        assert_eq!(config.region_id_fields.value[0], "nomgeo");
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
target_crs = 32614
buffer_distance = 500.0
tie_break = "first-match"
region_id_fields = ["distrito"]
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.target_crs.value, 32614);
        assert_eq!(config.target_crs.source, ConfigSource::File);
        assert_eq!(config.buffer_distance.value, 500.0);
        assert_eq!(config.tie_break.value, TieBreak::FirstMatch);
        assert_eq!(config.region_id_fields.value, vec!["distrito".to_string()]);
        assert_eq!(config.fallback_crs.source, ConfigSource::Default);
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = LayeredConfig::with_defaults()
            .load_from_file("/definitely/not/here/geotally.toml")
            .unwrap_err();
        assert!(matches!(err, GeotallyError::MissingInput { .. }));
    }

    #[test]
    fn test_negative_buffer_in_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "buffer_distance = -5.0").unwrap();

        let err = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, GeotallyError::ConfigInvalid { ref key, .. } if key == "buffer_distance"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            target_crs: Some(3857),
            buffer_distance: Some(250.0),
            ..Default::default()
        };

        config.update_from_cli(overrides);

        assert_eq!(config.target_crs.value, 3857);
        assert_eq!(config.target_crs.source, ConfigSource::Cli);
        assert_eq!(config.buffer_distance.value, 250.0);
        // These should still be defaults
        assert_eq!(config.fallback_crs.source, ConfigSource::Default);
        assert_eq!(config.tie_break.source, ConfigSource::Default);

        let settings = config.settings();
        assert_eq!(settings.target_crs, Crs::web_mercator());
        assert_eq!(settings.buffer_distance, 250.0);
    }

    #[test]
    fn test_parse_epsg() {
        assert_eq!(parse_epsg("6372").unwrap(), 6372);
        assert_eq!(parse_epsg("EPSG:3857").unwrap(), 3857);
        assert!(parse_epsg("web mercator").is_err());
    }

    #[test]
    fn test_parse_buffer_distance() {
        assert_eq!(parse_buffer_distance("500").unwrap(), 500.0);
        assert_eq!(parse_buffer_distance("0").unwrap(), 0.0);
        assert!(parse_buffer_distance("-1").is_err());
        assert!(parse_buffer_distance("NaN").is_err());
    }

    #[test]
    fn test_parse_tie_break() {
        assert_eq!(parse_tie_break("first-match").unwrap(), TieBreak::FirstMatch);
        assert_eq!(parse_tie_break("FIRST_MATCH").unwrap(), TieBreak::FirstMatch);
        assert_eq!(
            parse_tie_break("containment-then-centroid").unwrap(),
            TieBreak::ContainmentThenCentroid
        );
        assert!(parse_tie_break("random").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("target_crs"));
        assert!(map.contains_key("buffer_distance"));
        assert!(map.contains_key("tie_break"));

        let (crs_value, crs_source) = &map["target_crs"];
        assert_eq!(crs_value, "EPSG:6372 (Mexico ITRF2008 / LCC)");
        assert_eq!(*crs_source, ConfigSource::Default);
    }
}
