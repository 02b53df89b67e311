use console::style;
use geotally_core::GeotallyError;
use std::fmt;
use std::path::Path;

/// Error with context and suggestions for the terminal
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for a missing input file
pub fn input_not_found(path: &Path) -> CliError {
    CliError::new("Input file not found")
        .with_context(format!("The specified file does not exist.\n\nPath: {}", path.display()))
        .with_suggestion("Check the file path and try again")
        .with_suggestion("Use absolute path or path relative to current directory")
        .with_help("Run: geotally assign --help")
}

/// Create error for an input with nothing in it
pub fn empty_input(what: &str) -> CliError {
    CliError::new(format!("No {} found", what))
        .with_context(format!("The {} file contains no features.", what))
        .with_suggestion("Check that the file is a non-empty GeoJSON FeatureCollection")
}

/// Create error for an unbuildable projection
pub fn projection_unavailable(from: &str, to: &str, reason: &str) -> CliError {
    CliError::new("Projection unavailable")
        .with_context(format!(
            "Neither the target nor the fallback CRS could be built.\n\nFrom: {}\nTo: {}\nReason: {}",
            from, to, reason
        ))
        .with_suggestion("Pick another metric CRS: --target-crs 3857")
        .with_suggestion("Or set GEOTALLY_FALLBACK_CRS to a CRS your PROJ install supports")
        .with_help("Run: geotally config")
}

/// Create error for an attribute table that does not cover every region
pub fn attributes_incomplete(missing: &[String]) -> CliError {
    CliError::new("Attribute table is incomplete")
        .with_context(format!("No attribute record for: {}", missing.join(", ")))
        .with_suggestion("Add a [regions.\"NAME\"] entry for each missing region")
        .with_suggestion("Or check that region names in the GeoJSON match the table keys")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check geotally.toml for syntax errors")
        .with_suggestion("Or check GEOTALLY_* environment variables")
        .with_help("Run: geotally config")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    match error.downcast_ref::<GeotallyError>() {
        Some(GeotallyError::MissingInput { path }) => input_not_found(path),
        Some(GeotallyError::EmptyInput { what }) => empty_input(what),
        Some(GeotallyError::ProjectionUnavailable { from, to, reason }) => {
            projection_unavailable(from, to, reason)
        }
        Some(GeotallyError::AttributesIncomplete { missing }) => attributes_incomplete(missing),
        Some(GeotallyError::ConfigInvalid { key, reason }) => invalid_config(key, reason),
        _ => CliError::new(format!("{:#}", error)),
    }
}
