//! Config command implementation

use crate::cli::ConfigArgs;
use crate::config_loader::{config_path, load_config};
use crate::output::OutputWriter;
use crate::output_types::{ConfigOutput, ConfigRow};
use anyhow::Result;
use std::path::Path;

pub fn execute(_args: ConfigArgs, explicit: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(explicit)?;

    let values: Vec<ConfigRow> = config
        .to_inspection_map()
        .iter()
        .map(|(key, (value, source))| ConfigRow::new(key, value, *source))
        .collect();

    if output.is_json() {
        return output.result(ConfigOutput { values });
    }

    output.section("Effective Configuration");
    match config_path(explicit) {
        Some(path) => output.kv("Config file", path.display()),
        None => output.kv("Config file", "(none)"),
    }
    output.table(values);
    Ok(())
}
