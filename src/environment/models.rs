//! Environment data models.
//!
//! An environment is a named set of request defaults (base URL, timeout and
//! headers) for one deployment of an API, such as `dev`, `staging` or `prod`.

use crate::error::{ApiError, EntityKind, Result};
use crate::models::request::set_header;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// A single named environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Environment {
    /// Environment name (e.g., "dev", "staging", "production")
    pub name: String,

    /// Base URL that relative request URLs are joined to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,

    /// Timeout applied when the request itself sets none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<Duration>,

    /// Headers sent with every request executed in this environment.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Environment {
    /// Creates a new environment with the given name and no defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parses and sets the base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    /// Sets the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Sets a default header, replacing one whose name differs only in case.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.default_headers, name.into(), value.into());
        self
    }

    /// Whether this is the empty built-in default.
    pub fn is_builtin_default(&self) -> bool {
        self.base_url.is_none() && self.default_timeout.is_none() && self.default_headers.is_empty()
    }

    /// Checks the name and base URL.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidConfig(
                "environment name must not be empty".to_string(),
            ));
        }

        if let Some(base_url) = &self.base_url {
            match base_url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(ApiError::InvalidConfig(format!(
                        "environment '{}' base URL must be http or https, got '{}'",
                        self.name, other
                    )))
                }
            }
        }

        if self.default_timeout == Some(Duration::ZERO) {
            return Err(ApiError::InvalidConfig(format!(
                "environment '{}' timeout must be greater than 0",
                self.name
            )));
        }

        Ok(())
    }
}

/// Container for all environments and the active selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Environments {
    /// Named environments, keyed by name.
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,

    /// Currently active environment name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

impl Environments {
    /// Creates a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an environment, refusing to replace an existing one unless
    /// `overwrite` is set.
    pub fn add_environment(&mut self, env: Environment, overwrite: bool) -> Result<()> {
        if !overwrite && self.environments.contains_key(&env.name) {
            return Err(ApiError::duplicate(EntityKind::Environment, env.name));
        }
        self.environments.insert(env.name.clone(), env);
        Ok(())
    }

    /// Removes an environment, clearing the active selection if it pointed there.
    pub fn remove_environment(&mut self, name: &str) -> Option<Environment> {
        let removed = self.environments.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Some(removed)
    }

    /// Gets an environment by name
    pub fn get_environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    /// Sets the active environment. Returns false for an unknown name.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.environments.contains_key(name) {
            self.active = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// Gets the currently active environment
    pub fn get_active(&self) -> Option<&Environment> {
        self.active
            .as_ref()
            .and_then(|name| self.environments.get(name))
    }

    /// Lists environment names in sorted order.
    pub fn list_environments(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// Checks if an environment exists
    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// Returns the number of environments
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    /// Checks if there are no environments
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Validates every environment and the active selection.
    pub fn validate(&self) -> Result<()> {
        for (key, env) in &self.environments {
            if key != &env.name {
                return Err(ApiError::InvalidConfig(format!(
                    "environment stored under '{}' is named '{}'",
                    key, env.name
                )));
            }
            env.validate()?;
        }

        if let Some(active) = &self.active {
            if !self.environments.contains_key(active) {
                return Err(ApiError::InvalidConfig(format!(
                    "active environment '{}' does not exist",
                    active
                )));
            }
        }

        Ok(())
    }
}
