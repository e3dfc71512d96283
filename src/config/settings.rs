//! Application settings.
//!
//! Settings come from an optional `config.toml` next to the binary, with
//! environment variables taking precedence for deployment overrides. Missing
//! file and missing keys both fall back to defaults, so a bare checkout runs.

use crate::errors::{Error, Result};
use serde::Deserialize;
use tracing::info;

/// Default number of attempts for each best-effort side-effect step.
const DEFAULT_APPROVAL_RETRY_ATTEMPTS: u32 = 3;

/// Runtime settings for the reconciliation core.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Database connection URL
    #[serde(default = "super::database::get_database_url")]
    pub database_url: String,
    /// Attempts per quotation-approval step before giving up (logged, not fatal)
    #[serde(default = "default_retry_attempts")]
    pub approval_retry_attempts: u32,
}

fn default_retry_attempts() -> u32 {
    DEFAULT_APPROVAL_RETRY_ATTEMPTS
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_url: super::database::get_database_url(),
            approval_retry_attempts: DEFAULT_APPROVAL_RETRY_ATTEMPTS,
        }
    }
}

/// Loads application settings from `config.toml` if present, otherwise defaults.
///
/// `DATABASE_URL` from the environment always wins over the file value.
pub fn load_app_settings() -> Result<AppSettings> {
    let mut settings = match std::fs::read_to_string("config.toml") {
        Ok(contents) => toml::from_str::<AppSettings>(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })?,
        Err(_) => {
            info!("No config.toml found, using default settings.");
            AppSettings::default()
        }
    };

    if let Ok(url) = std::env::var("DATABASE_URL") {
        settings.database_url = url;
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.approval_retry_attempts, 3);
        assert!(settings.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn test_parse_settings_toml() {
        let settings: AppSettings = toml::from_str(
            r#"
            database_url = "sqlite::memory:"
            approval_retry_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.approval_retry_attempts, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: AppSettings = toml::from_str("").unwrap();
        assert_eq!(settings.approval_retry_attempts, 3);
    }
}
