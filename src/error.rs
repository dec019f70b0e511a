//! Error types for mission loading and persistence.
//!
//! Configuration errors never abort a mission load: they are collected in
//! [`Diagnostics`] and the offending construct falls back to a safe default.
//! [`MissionError`] is reserved for failures that leave nothing to load.

/// A problem found while constructing mission rules from a descriptor.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown condition type '{0}'")]
    UnknownConditionType(String),

    #[error("unknown action type '{0}'")]
    UnknownActionType(String),

    #[error("invalid parameters for {kind}: {message}")]
    InvalidParams { kind: &'static str, message: String },

    #[error("unknown team '{0}'")]
    UnknownTeam(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("unknown spacecraft '{0}'")]
    UnknownSpacecraft(String),

    #[error("unknown spacecraft class '{0}'")]
    UnknownClass(String),

    #[error("unknown loadout '{loadout}' for class '{class}'")]
    UnknownLoadout { class: String, loadout: String },

    #[error("duplicate event name '{0}'")]
    DuplicateEvent(String),

    #[error("invalid trigger in event '{event}': {reason}")]
    InvalidTrigger { event: String, reason: &'static str },

    #[error("{kind} conditions cannot be used as objectives")]
    NotObjective { kind: &'static str },

    #[error("count condition with relation '{0}' cannot be used as an objective")]
    UnsupportedObjectiveRelation(&'static str),

    #[error("spacecraft '{0}' has both position and formation, using position")]
    PositionOverridesFormation(String),

    #[error("more than one piloted spacecraft ('{0}'), keeping the first")]
    MultiplePiloted(String),
}

impl ConfigError {
    /// Wrap a parameter deserialization failure for the given condition/action kind.
    pub fn params(kind: &'static str, error: impl std::fmt::Display) -> Self {
        ConfigError::InvalidParams {
            kind,
            message: error.to_string(),
        }
    }
}

/// Failures that prevent a mission or a persisted file from being used at all.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal diagnostic channel for configuration problems.
///
/// Every report is logged at `warn` level and kept so callers (editors,
/// tests) can inspect what was substituted during load.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    reports: Vec<ConfigError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a configuration problem
    pub fn report(&mut self, error: ConfigError) {
        log::warn!("mission config: {}", error);
        self.reports.push(error);
    }

    /// Record the error of a failed construction and fall back to `default`
    pub fn recover<T>(&mut self, result: Result<T, ConfigError>, default: impl FnOnce() -> T) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                self.report(error);
                default()
            }
        }
    }

    /// Record the error of a failed construction, keeping `None` on failure
    pub fn ok<T>(&mut self, result: Result<T, ConfigError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(error);
                None
            }
        }
    }

    pub fn reports(&self) -> &[ConfigError] {
        &self.reports
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_substitutes_default() {
        let mut diagnostics = Diagnostics::new();
        let value = diagnostics.recover(Err(ConfigError::UnknownTeam("rebels".into())), || 7);
        assert_eq!(value, 7);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.reports()[0].to_string(),
            "unknown team 'rebels'"
        );
    }

    #[test]
    fn test_ok_passes_value_through() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.ok::<u32>(Ok(3)), Some(3));
        assert!(diagnostics.is_empty());
    }
}
