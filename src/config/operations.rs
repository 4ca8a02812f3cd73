//! Config loading and validation.

use super::model::ScenarioConfig;
use super::types::MAX_ROUNDS;
use crate::error::{GuardError, Result};
use std::path::Path;

impl ScenarioConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ScenarioConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `lock_name` must be non-empty
    /// - `rounds`, `hold_ms`, `ready_timeout_ms` and `child_lock_timeout_ms` must be positive
    /// - `rounds` must not exceed [`MAX_ROUNDS`]
    /// - `child_exit_timeout_ms` must exceed `child_lock_timeout_ms`, so a child
    ///   that gives up on the lock gets to report it before being killed
    pub fn validate(&self) -> Result<()> {
        if self.lock_name.trim().is_empty() {
            return Err(invalid("lock_name must be non-empty"));
        }
        if self.rounds == 0 {
            return Err(invalid("rounds must be greater than 0"));
        }
        if self.rounds > MAX_ROUNDS {
            return Err(GuardError::UserError(format!(
                "config validation failed: rounds ({}) must not exceed {}",
                self.rounds, MAX_ROUNDS
            )));
        }
        if self.hold_ms == 0 {
            return Err(invalid("hold_ms must be greater than 0"));
        }
        if self.ready_timeout_ms == 0 {
            return Err(invalid("ready_timeout_ms must be greater than 0"));
        }
        if self.child_lock_timeout_ms == 0 {
            return Err(invalid("child_lock_timeout_ms must be greater than 0"));
        }
        if self.child_exit_timeout_ms <= self.child_lock_timeout_ms {
            return Err(GuardError::UserError(format!(
                "config validation failed: child_exit_timeout_ms ({}) must be greater than child_lock_timeout_ms ({})",
                self.child_exit_timeout_ms, self.child_lock_timeout_ms
            )));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> GuardError {
    GuardError::UserError(format!("config validation failed: {}", reason))
}
