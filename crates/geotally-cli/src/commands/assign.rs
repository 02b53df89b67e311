//! Assign command implementation

use crate::cli::AssignArgs;
use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use crate::output_types::{AssignOutput, MethodRow, ParentRow, PartyRow, RegionRow};
use anyhow::{Context, Result};
use chrono::Utc;
use geotally_core::aggregate::{
    count_by_region, join_attributes, party_breakdown, rank_by_count, rank_by_count_ascending,
    rollup_by_parent, CountStats,
};
use geotally_core::attributes::AttributeTable;
use geotally_core::config::{check_buffer_distance, parse_epsg, CliConfigOverrides};
use geotally_core::formats::{GeoJsonReader, GeoJsonWriter};
use geotally_core::models::AssignmentMethod;
use geotally_geo::{RegionAssigner, RunContext};
use std::path::Path;

pub fn execute(args: AssignArgs, explicit: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let target_crs = args.target_crs.as_deref().map(parse_epsg).transpose()?;
    let fallback_crs = args.fallback_crs.as_deref().map(parse_epsg).transpose()?;
    if let Some(distance) = args.buffer {
        check_buffer_distance(distance)?;
    }

    let overrides = CliConfigOverrides {
        target_crs,
        fallback_crs,
        buffer_distance: args.buffer,
        tie_break: args.tie_break.map(Into::into),
    };
    let config = load_config_with_overrides(explicit, overrides)?;

    // Load inputs
    let reader = GeoJsonReader::new().with_region_id_fields(config.region_id_fields.value.clone());
    let regions = reader
        .read_regions(&args.regions)
        .with_context(|| format!("Failed to read regions from {}", args.regions.display()))?;
    let points = reader
        .read_points(&args.points)
        .with_context(|| format!("Failed to read points from {}", args.points.display()))?;

    let attributes = match &args.attributes {
        Some(path) => {
            let table = AttributeTable::load(path)
                .with_context(|| format!("Failed to read attributes from {}", path.display()))?;
            table.validate_against(&regions)?;
            Some(table)
        }
        None => None,
    };

    // Run the engine
    let ctx = RunContext::new(config.settings());
    let outcome = RegionAssigner::default().assign(&ctx, &points, &regions)?;

    // Aggregate
    let counts = count_by_region(&regions, &points.points, &outcome.table);
    let stats = CountStats::from_counts(&counts);
    let summaries = join_attributes(counts, attributes.as_ref());
    let parties = if attributes.is_some() { party_breakdown(&summaries) } else { Vec::new() };
    let parents = rollup_by_parent(&summaries);

    // Persist
    let mut written = Vec::new();
    if let Some(path) = &args.output_points {
        GeoJsonWriter
            .write_points(path, &points, &outcome.table)
            .with_context(|| format!("Failed to write points to {}", path.display()))?;
        written.push(path.display().to_string());
    }
    if let Some(path) = &args.output_regions {
        GeoJsonWriter
            .write_regions(path, &regions, &summaries)
            .with_context(|| format!("Failed to write regions to {}", path.display()))?;
        written.push(path.display().to_string());
    }

    let report = &outcome.report;
    if report.projection_fallback {
        output.warning(format!("Preferred CRS unavailable; compared in {}", report.target_crs));
    }

    if output.is_json() {
        let least_stores =
            rank_by_count_ascending(&summaries).into_iter().take(args.bottom).cloned().collect();
        return output.result(AssignOutput {
            generated_at: Utc::now(),
            points_file: args.points.display().to_string(),
            regions_file: args.regions.display().to_string(),
            report: outcome.report.clone(),
            regions: summaries,
            parties,
            least_stores,
            parents,
            stats,
            written,
        });
    }

    output.section("Assignment");
    output.kv("Points", points.len());
    output.kv("Regions", regions.len());
    output.kv("Compared in", &report.target_crs);
    output.kv("Buffer", ctx.settings().buffer_distance);
    output.kv("Tie-break", ctx.settings().tie_break);
    output.kv(
        "Region geometries",
        format!(
            "{} invalid before repair, {} usable after",
            report.regions.invalid_before(),
            report.regions.valid_after()
        ),
    );
    if report.regions.unprojectable > 0 {
        output.warning(format!(
            "{} regions could not be projected into {}",
            report.regions.unprojectable, report.target_crs
        ));
    }
    output.table(vec![
        MethodRow { method: AssignmentMethod::Containment.to_string(), points: report.by_containment },
        MethodRow {
            method: AssignmentMethod::NearestCentroid.to_string(),
            points: report.by_nearest,
        },
        MethodRow { method: AssignmentMethod::DefaultRegion.to_string(), points: report.by_default },
    ]);
    if report.ambiguous > 0 {
        output.info(format!("{} points matched more than one buffered region", report.ambiguous));
    }
    if report.by_default > 0 {
        output.warning(format!(
            "{} points had no usable location and were placed in the default region",
            report.by_default
        ));
    }

    output.section("Stores per region");
    output.table(summaries.iter().map(RegionRow::from).collect());

    if let Some(stats) = &stats {
        output.section("Statistics");
        output.kv("Total", stats.total);
        output.kv("Mean per region", format!("{:.2}", stats.mean));
        output.kv("Median per region", format!("{:.1}", stats.median));
        output.kv("Range", format!("{} - {}", stats.min, stats.max));
    }

    output.section(format!("Top {} regions", args.top));
    output.table(rank_by_count(&summaries).into_iter().take(args.top).map(RegionRow::from).collect());

    output.section(format!("Bottom {} regions", args.bottom));
    output.table(
        rank_by_count_ascending(&summaries)
            .into_iter()
            .take(args.bottom)
            .map(RegionRow::from)
            .collect(),
    );

    if !parents.is_empty() {
        output.section("By parent region");
        output.table(parents.iter().map(ParentRow::from).collect());
    }

    if !parties.is_empty() {
        output.section("By winning party");
        output.table(parties.iter().map(PartyRow::from).collect());
    }

    for path in &written {
        output.success(format!("Wrote {}", path));
    }

    Ok(())
}
