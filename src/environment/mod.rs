//! Environment registry.
//!
//! Environments are named sets of request defaults. At most one is active at a
//! time; when none is, [`EnvironmentRegistry::resolve_defaults`] returns an
//! empty built-in environment and the engine defaults apply.
//!
//! # Example
//!
//! ```
//! use api_tester::environment::{Environment, EnvironmentRegistry};
//!
//! let registry = EnvironmentRegistry::new();
//! let dev = Environment::new("dev").with_base_url("http://localhost:3000").unwrap();
//! registry.register(dev, false).unwrap();
//! registry.set_active("dev").unwrap();
//!
//! assert_eq!(registry.resolve_defaults().name, "dev");
//! ```

pub mod loader;
pub mod models;

use crate::error::{ApiError, EntityKind, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use loader::{load_environments, save_environments};
pub use models::{Environment, Environments};

/// Thread-safe registry of environments.
///
/// Clones share the same state. When opened from a file, every mutation
/// rewrites the snapshot while the write lock is held, and the in-memory
/// state only changes once the write succeeded.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRegistry {
    environments: Arc<RwLock<Environments>>,
    path: Option<PathBuf>,
}

impl EnvironmentRegistry {
    /// Creates an empty, in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory registry holding `environments`.
    pub fn with_environments(environments: Environments) -> Result<Self> {
        environments.validate()?;
        Ok(Self {
            environments: Arc::new(RwLock::new(environments)),
            path: None,
        })
    }

    /// Opens a registry persisted at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let environments = load_environments(&path)?;
        info!(
            "Environment registry opened with {} environment(s)",
            environments.len()
        );

        Ok(Self {
            environments: Arc::new(RwLock::new(environments)),
            path: Some(path),
        })
    }

    /// Snapshot file path, when persistence is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers an environment.
    ///
    /// # Errors
    ///
    /// * `DuplicateName` - the name exists and `overwrite` is false
    /// * `InvalidConfig` - empty name, non-http(s) base URL or zero timeout
    pub fn register(&self, env: Environment, overwrite: bool) -> Result<()> {
        env.validate()?;
        let name = env.name.clone();

        self.mutate(|envs| envs.add_environment(env, overwrite))?;
        debug!("Registered environment '{}'", name);
        Ok(())
    }

    /// Makes `name` the active environment.
    pub fn set_active(&self, name: &str) -> Result<()> {
        self.mutate(|envs| {
            if envs.set_active(name) {
                Ok(())
            } else {
                Err(ApiError::not_found(EntityKind::Environment, name))
            }
        })?;
        info!("Active environment set to '{}'", name);
        Ok(())
    }

    /// Deactivates the current environment, if any.
    pub fn clear_active(&self) -> Result<()> {
        self.mutate(|envs| {
            envs.active = None;
            Ok(())
        })
    }

    /// Removes an environment and returns it.
    ///
    /// Removing the active environment leaves no environment active.
    pub fn remove(&self, name: &str) -> Result<Environment> {
        let removed = self.mutate(|envs| {
            envs.remove_environment(name)
                .ok_or_else(|| ApiError::not_found(EntityKind::Environment, name))
        })?;
        debug!("Removed environment '{}'", name);
        Ok(removed)
    }

    /// Returns the active environment, or the empty built-in default.
    pub fn resolve_defaults(&self) -> Environment {
        self.read()
            .get_active()
            .cloned()
            .unwrap_or_default()
    }

    /// Gets an environment by name.
    pub fn get(&self, name: &str) -> Result<Environment> {
        self.read()
            .get_environment(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(EntityKind::Environment, name))
    }

    /// Lists environment names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.read().list_environments()
    }

    /// Gets the name of the currently active environment.
    pub fn active_name(&self) -> Option<String> {
        self.read().active.clone()
    }

    /// A copy of the whole registry.
    pub fn snapshot(&self) -> Environments {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Environments> {
        self.environments
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Environments> {
        self.environments
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `f` to a copy of the state, persists the copy, then swaps it in.
    fn mutate<T>(&self, f: impl FnOnce(&mut Environments) -> Result<T>) -> Result<T> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let output = f(&mut next)?;

        if let Some(path) = &self.path {
            save_environments(path, &next)?;
        }

        *guard = next;
        Ok(output)
    }
}
