/// Database connection and schema management
pub mod database;

/// Application settings loaded from config.toml and environment variables
pub mod settings;

pub use settings::{AppSettings, load_app_settings};
