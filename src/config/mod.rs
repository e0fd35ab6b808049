//! Configuration management for the API tester.
//!
//! Configuration is plain data: it is loaded from a JSON value (optionally
//! nested under an `"api-tester"` key) or a JSON file, merged over defaults,
//! validated, and then handed to [`ApiTester`](crate::ApiTester). There is no
//! process-wide configuration singleton, so independent instances can run side
//! by side with different settings.

pub mod schema;

pub use schema::ApiTesterConfig;

use crate::error::{ApiError, Result};
use log::warn;
use serde_json::Value;
use std::path::Path;

/// Key under which settings may be nested in a larger settings document.
pub const SETTINGS_KEY: &str = "api-tester";

/// Loads configuration from a JSON value.
///
/// When the value contains an `"api-tester"` object, that object is used;
/// otherwise the value itself is read as the settings object. Fields that are
/// absent fall back to their defaults.
///
/// # Arguments
///
/// * `settings_json` - Optional JSON value containing user settings
///
/// # Returns
///
/// `Ok(ApiTesterConfig)` with the loaded configuration, or
/// `Err(ApiError::InvalidConfig)` if parsing or validation fails.
///
/// # Example
///
/// ```
/// use api_tester::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "api-tester": {
///         "maxHistory": 50,
///         "validateSsl": false
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.max_history, 50);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<ApiTesterConfig> {
    let mut config = ApiTesterConfig::default();

    if let Some(settings) = settings_json {
        let section = match settings.get(SETTINGS_KEY) {
            Some(nested) => nested.clone(),
            None => settings,
        };

        config = config.merge(&section).map_err(|e| {
            warn!("Failed to parse api-tester settings: {}", e);
            ApiError::InvalidConfig(e)
        })?;
    }

    config.validate().map_err(ApiError::InvalidConfig)?;

    Ok(config)
}

/// Loads configuration from a JSON file.
///
/// A missing file yields the default configuration.
pub fn load_config_file(path: &Path) -> Result<ApiTesterConfig> {
    if !path.exists() {
        return load_config(None);
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    load_config(Some(value))
}
