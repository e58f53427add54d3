use chrono::{Datelike, Utc};

use crate::config::EngineSettings;

/// Everything an engine call may depend on besides the profile itself.
///
/// Built once per request and passed down explicitly; the engine never consults
/// the clock or process environment on its own.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineContext {
    pub settings: EngineSettings,
    pub current_year: i32,
}

impl EngineContext {
    pub fn new(settings: EngineSettings, current_year: i32) -> Self {
        Self { settings, current_year }
    }

    /// Uses `settings.reference_year` when pinned, otherwise the current UTC year.
    pub fn from_settings(settings: EngineSettings) -> Self {
        let current_year = settings.reference_year.unwrap_or_else(|| Utc::now().year());
        Self { settings, current_year }
    }

    pub fn for_year(current_year: i32) -> Self {
        Self::new(EngineSettings::default(), current_year)
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::from_settings(EngineSettings::default())
    }
}
