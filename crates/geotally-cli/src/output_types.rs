use chrono::{DateTime, Utc};
use geotally_core::aggregate::{CountStats, ParentRollup, PartySummary, RegionSummary};
use geotally_core::config::ConfigSource;
use geotally_geo::{AssignmentReport, NormalizationSummary};
use serde::Serialize;
use tabled::Tabled;

/// Output for assign command
#[derive(Debug, Serialize)]
pub struct AssignOutput {
    pub generated_at: DateTime<Utc>,
    pub points_file: String,
    pub regions_file: String,
    pub report: AssignmentReport,
    pub regions: Vec<RegionSummary>,
    pub parties: Vec<PartySummary>,
    /// Regions with the fewest points, lowest first
    pub least_stores: Vec<RegionSummary>,
    pub parents: Vec<ParentRollup>,
    pub stats: Option<CountStats>,
    pub written: Vec<String>,
}

/// One row of the per-region table
#[derive(Debug, Serialize, Tabled)]
pub struct RegionRow {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Stores")]
    pub points: usize,
    #[tabled(rename = "With address")]
    pub addresses: usize,
    #[tabled(rename = "Party")]
    pub party: String,
    #[tabled(rename = "Votes")]
    pub votes: String,
}

impl From<&RegionSummary> for RegionRow {
    fn from(summary: &RegionSummary) -> Self {
        Self {
            region: summary.region_id.clone(),
            points: summary.point_count,
            addresses: summary.address_count,
            party: summary.party().to_string(),
            votes: summary
                .attributes
                .as_ref()
                .map(|a| a.total_votes.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// One row of the party breakdown
#[derive(Debug, Serialize, Tabled)]
pub struct PartyRow {
    #[tabled(rename = "Party")]
    pub party: String,
    #[tabled(rename = "Regions")]
    pub regions: usize,
    #[tabled(rename = "Stores")]
    pub points: usize,
    #[tabled(rename = "Stores/region")]
    pub mean_points: String,
    #[tabled(rename = "Votes")]
    pub total_votes: u64,
    #[tabled(rename = "Turnout %")]
    pub mean_turnout: String,
}

impl From<&PartySummary> for PartyRow {
    fn from(summary: &PartySummary) -> Self {
        Self {
            party: summary.party.clone(),
            regions: summary.regions,
            points: summary.points,
            mean_points: format!("{:.1}", summary.mean_points),
            total_votes: summary.total_votes,
            mean_turnout: summary
                .mean_turnout
                .map(|t| format!("{:.1}", t))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Counts rolled up to an enclosing region
#[derive(Debug, Serialize, Tabled)]
pub struct ParentRow {
    #[tabled(rename = "Parent")]
    pub parent: String,
    #[tabled(rename = "Regions")]
    pub regions: usize,
    #[tabled(rename = "Stores")]
    pub points: usize,
}

impl From<&ParentRollup> for ParentRow {
    fn from(rollup: &ParentRollup) -> Self {
        Self { parent: rollup.parent.clone(), regions: rollup.regions, points: rollup.points }
    }
}

/// Assignment counts by method
#[derive(Debug, Serialize, Tabled)]
pub struct MethodRow {
    #[tabled(rename = "Method")]
    pub method: String,
    #[tabled(rename = "Points")]
    pub points: usize,
}

/// Output for validate command
#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub path: String,
    pub kind: String,
    pub crs: u32,
    pub summary: NormalizationSummary,
    pub flagged: Vec<FlaggedRecord>,
}

/// A record that was not valid as loaded
#[derive(Debug, Serialize, Tabled)]
pub struct FlaggedRecord {
    #[tabled(rename = "Record")]
    pub id: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub values: Vec<ConfigRow>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl ConfigRow {
    pub fn new(key: &str, value: &str, source: ConfigSource) -> Self {
        let source = match source {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
            ConfigSource::Cli => "cli",
        };
        Self { key: key.to_string(), value: value.to_string(), source: source.to_string() }
    }
}
