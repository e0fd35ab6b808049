//! Environment snapshot loading and saving.
//!
//! The registry is persisted as a single JSON document holding every
//! environment and the active name. A missing file means no environments.

use super::models::Environments;
use crate::error::Result;
use crate::persistence::{read_json, write_json_atomic};
use log::debug;
use std::path::Path;

/// Loads the environment snapshot at `path`.
///
/// # Returns
///
/// * `Ok(Environments)` - Loaded environments, or empty if the file is missing
/// * `Err(ApiError)` - If the file exists but cannot be read, parsed or validated
pub fn load_environments(path: &Path) -> Result<Environments> {
    let environments: Environments = match read_json(path)? {
        Some(envs) => envs,
        None => {
            debug!("No environment file at {}", path.display());
            return Ok(Environments::new());
        }
    };

    environments.validate()?;
    debug!(
        "Loaded {} environment(s) from {}",
        environments.len(),
        path.display()
    );

    Ok(environments)
}

/// Writes the environment snapshot to `path`, replacing it atomically.
pub fn save_environments(path: &Path, environments: &Environments) -> Result<()> {
    write_json_atomic(path, environments)
}
