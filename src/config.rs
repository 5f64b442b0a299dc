//! Planner configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! history_cap = 1000
//! max_passes = 500
//! popular_slot_limit = 6
//! timezone = "Europe/Berlin"
//!
//! [durations]
//! course = 90
//! event = 180
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::DurationTable;
use crate::repository::memory::DEFAULT_HISTORY_CAP;
use crate::scheduler::{DEFAULT_MAX_PASSES, DEFAULT_POPULAR_SLOT_LIMIT};

/// Planner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// History entries retained before the oldest are dropped.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Allocation pass guard.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
    /// Popular slots reported by analytics.
    #[serde(default = "default_popular_slot_limit")]
    pub popular_slot_limit: usize,
    /// Name of the single timezone all dates and times are read in.
    /// Informational; no conversion is performed.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Session length per demand kind.
    #[serde(default)]
    pub durations: DurationTable,
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_max_passes() -> u32 {
    DEFAULT_MAX_PASSES
}

fn default_popular_slot_limit() -> usize {
    DEFAULT_POPULAR_SLOT_LIMIT
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            max_passes: default_max_passes(),
            popular_slot_limit: default_popular_slot_limit(),
            timezone: default_timezone(),
            durations: DurationTable::default(),
        }
    }
}

impl PlannerConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    fn validated(self) -> Result<Self> {
        if self.history_cap == 0 {
            return Err(Error::Config("history_cap must be at least 1".into()));
        }
        if self.max_passes == 0 {
            return Err(Error::Config("max_passes must be at least 1".into()));
        }
        if self.timezone.trim().is_empty() {
            return Err(Error::Config("timezone must not be empty".into()));
        }
        Ok(self)
    }
}
