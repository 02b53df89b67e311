use clap::{Parser, Subcommand, ValueEnum};
use geotally_core::models::TieBreak;
use std::path::PathBuf;

/// Geotally - Point-to-region attribution for retail locations
#[derive(Parser, Debug)]
#[command(name = "geotally")]
#[command(about = "Assign store locations to regions and tabulate them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign every point to a region and report the counts
    Assign(AssignArgs),

    /// Check the geometries of a point or region file without assigning
    Validate(ValidateArgs),

    /// Show the effective configuration and where each value came from
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct AssignArgs {
    /// Store locations (GeoJSON)
    #[arg(long, value_name = "FILE")]
    pub points: PathBuf,

    /// Region boundaries (GeoJSON)
    #[arg(long, value_name = "FILE")]
    pub regions: PathBuf,

    /// Per-region electoral attributes (TOML)
    #[arg(long, value_name = "FILE")]
    pub attributes: Option<PathBuf>,

    /// Write the points with their assigned region here
    #[arg(long, value_name = "FILE")]
    pub output_points: Option<PathBuf>,

    /// Write the regions with their counts here
    #[arg(long, value_name = "FILE")]
    pub output_regions: Option<PathBuf>,

    /// Metric CRS for comparisons (EPSG code, e.g. 6372 or EPSG:3857)
    #[arg(long, value_name = "EPSG")]
    pub target_crs: Option<String>,

    /// Metric CRS used when the target CRS cannot be built
    #[arg(long, value_name = "EPSG")]
    pub fallback_crs: Option<String>,

    /// Region boundary tolerance in target CRS units
    #[arg(long, value_name = "DISTANCE")]
    pub buffer: Option<f64>,

    /// Policy for points that match several buffered regions
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,

    /// Number of regions listed in the ranking
    #[arg(long, default_value = "5")]
    pub top: usize,

    /// Number of regions listed in the least-stores ranking
    #[arg(long, default_value = "5")]
    pub bottom: usize,
}

/// Tie-break policy selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TieBreakArg {
    /// Original polygon first, then nearest centroid
    ContainmentThenCentroid,
    /// First region in file order
    FirstMatch,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::ContainmentThenCentroid => TieBreak::ContainmentThenCentroid,
            TieBreakArg::FirstMatch => TieBreak::FirstMatch,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// GeoJSON file to check
    pub path: PathBuf,

    /// What the file contains
    #[arg(long, value_enum, default_value = "regions")]
    pub kind: InputKind,
}

/// Kind of geometry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    /// Polygon boundaries
    Regions,
    /// Store locations
    Points,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {}
