//! Configuration module for Metrica.
//!
//! Handles the settings file, environment variable expansion and compiler
//! defaults.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, CompilerSettings, LoggingSettings, Settings, SettingsError,
};
