//! Validate command implementation

use crate::cli::{InputKind, ValidateArgs};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{FlaggedRecord, ValidateOutput};
use anyhow::{Context, Result};
use geotally_core::formats::GeoJsonReader;
use geotally_geo::validation::{check_point, check_region, GeometryStatus};
use geotally_geo::NormalizationSummary;
use std::path::Path;

pub fn execute(args: ValidateArgs, explicit: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(explicit)?;
    let reader = GeoJsonReader::new().with_region_id_fields(config.region_id_fields.value.clone());

    let (crs, checked): (u32, Vec<(String, GeometryStatus)>) = match args.kind {
        InputKind::Regions => {
            let table = reader
                .read_regions(&args.path)
                .with_context(|| format!("Failed to read regions from {}", args.path.display()))?;
            let checked = table
                .regions
                .iter()
                .map(|r| (r.id.clone(), check_region(&r.id, &r.geometry).1))
                .collect();
            (table.crs.epsg, checked)
        }
        InputKind::Points => {
            let table = reader
                .read_points(&args.path)
                .with_context(|| format!("Failed to read points from {}", args.path.display()))?;
            let checked = table
                .points
                .iter()
                .map(|p| (p.id.clone(), check_point(&p.id, p.location.as_ref()).1))
                .collect();
            (table.crs.epsg, checked)
        }
    };

    let statuses: Vec<GeometryStatus> = checked.iter().map(|(_, status)| *status).collect();
    let summary = NormalizationSummary::from_statuses(&statuses);
    let flagged: Vec<FlaggedRecord> = checked
        .into_iter()
        .filter(|(_, status)| *status != GeometryStatus::Valid)
        .map(|(id, status)| FlaggedRecord { id, status: status.to_string() })
        .collect();

    let kind = match args.kind {
        InputKind::Regions => "regions",
        InputKind::Points => "points",
    };

    if output.is_json() {
        return output.result(ValidateOutput {
            path: args.path.display().to_string(),
            kind: kind.to_string(),
            crs,
            summary,
            flagged,
        });
    }

    output.section(format!("Validation: {}", args.path.display()));
    output.kv("Kind", kind);
    output.kv("CRS", format!("EPSG:{}", crs));
    output.kv("Records", summary.total);
    output.kv("Valid", summary.valid);
    output.kv("Repairable", summary.repaired);
    output.kv("Degenerate", summary.degenerate);
    output.kv("Missing geometry", summary.missing);

    if flagged.is_empty() {
        output.success("All geometries are valid");
    } else {
        output.section("Flagged records");
        output.table(flagged);
        if summary.degenerate > 0 || summary.missing > 0 {
            output.warning(format!(
                "{} records have no usable geometry",
                summary.degenerate + summary.missing
            ));
        }
    }

    Ok(())
}
