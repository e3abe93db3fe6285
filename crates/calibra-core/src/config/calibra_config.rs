//! Top-level service configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

use super::RolloutPolicy;

/// Configuration for the Calibra service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibraConfig {
    /// Path to the SQLite database file. Flags override this.
    pub db_path: Option<String>,
    /// Rollout policy constants.
    pub policy: RolloutPolicy,
    /// Retention horizon for accuracy records, in days. Default: 90.
    pub accuracy_retention_days: Option<i64>,
}

impl CalibraConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Returns the effective retention horizon, defaulting to 90 days.
    pub fn effective_accuracy_retention_days(&self) -> i64 {
        self.accuracy_retention_days.unwrap_or(90)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "db_path = \"/var/lib/calibra/calibra.db\"\n\n\
             [policy]\nmae_threshold = 1.0\n"
        )
        .unwrap();

        let config = CalibraConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.db_path.as_deref(), Some("/var/lib/calibra/calibra.db"));
        assert!((config.policy.mae_threshold - 1.0).abs() < f64::EPSILON);
        // Unspecified policy fields fall back to defaults.
        assert_eq!(config.policy.min_eval_window_days, 3);
        assert_eq!(config.effective_accuracy_retention_days(), 90);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = CalibraConfig::from_toml_file(Path::new("/nonexistent/calibra.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
