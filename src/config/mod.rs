//! Configuration module for p12-convert
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{
    BundleCipher, BundleMac, BundleSettings, ExportSettings, LimitSettings, Settings,
};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from an explicit file, or from the default location
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
