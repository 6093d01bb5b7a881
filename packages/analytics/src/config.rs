//! Analytics configuration.
//!
//! Loaded from an optional TOML file. Every field has a default, so an
//! empty file (or no file) yields [`AnalyticsConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::AnalyticsError;

/// Thresholds and limits applied to rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Minimum vehicle count for a territory to be ranked by percentage.
    pub min_vehicles_for_percentage: u64,
    /// Minimum station count for a territory to be ranked by a ratio.
    pub min_stations_for_ratio: u64,
    /// Minimum electric vehicle count for a territory to be ranked by a
    /// ratio.
    pub min_vehicles_for_ratio: u64,
    /// Number of entries when a request does not specify one.
    pub default_limit: usize,
    /// Largest number of entries a request may ask for.
    pub max_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_vehicles_for_percentage: 100,
            min_stations_for_ratio: 1,
            min_vehicles_for_ratio: 10,
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl RankingConfig {
    /// Resolves a requested limit: default when absent, at least 1, at
    /// most `max_limit`.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Top-level analytics configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Ranking thresholds.
    pub ranking: RankingConfig,
}

impl AnalyticsConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the document is not valid
    /// TOML or has fields of the wrong type.
    pub fn from_toml(contents: &str) -> Result<Self, AnalyticsError> {
        toml::de::from_str(contents).map_err(|e| AnalyticsError::Validation {
            message: format!("Invalid analytics config: {e}"),
        })
    }

    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the file cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self, AnalyticsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| AnalyticsError::Validation {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Loads the file named by `EV_MAP_CONFIG`, or returns the defaults
    /// when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the variable names a file
    /// that cannot be read or parsed.
    pub fn from_env() -> Result<Self, AnalyticsError> {
        match std::env::var("EV_MAP_CONFIG") {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading analytics config from {path}");
                Self::load(Path::new(&path))
            }
            _ => Ok(Self::default()),
        }
    }
}
