//! Per-run context handed to every assignment stage.

use geotally_core::config::AssignSettings;
use tracing::Span;

/// Settings and the tracing span for one assignment run
#[derive(Debug, Clone)]
pub struct RunContext {
    settings: AssignSettings,
    span: Span,
}

impl RunContext {
    pub fn new(settings: AssignSettings) -> Self {
        let span = tracing::info_span!(
            "assign",
            target_crs = %settings.target_crs.authority(),
            buffer = settings.buffer_distance,
            tie_break = %settings.tie_break,
        );
        Self { settings, span }
    }

    pub fn settings(&self) -> &AssignSettings {
        &self.settings
    }

    /// Span every stage enters while it works
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(AssignSettings::default())
    }
}
