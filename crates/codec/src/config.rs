//! Codec configuration via TOML
//!
//! Every field has a default, so an empty file yields the default codec.

use chrono::FixedOffset;
use docwire_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default size at which bags switch to the external representation.
pub const DEFAULT_LINK_BAG_THRESHOLD: usize = 40;

/// Largest accepted time zone offset, in minutes.
pub const MAX_TIME_ZONE_OFFSET_MINUTES: i32 = 18 * 60;

/// Codec configuration.
///
/// # Example
///
/// ```toml
/// # Bags at or above this size are written with the external representation
/// link_bag_threshold = 40
///
/// # Database time zone used for DATE values, minutes east of UTC
/// time_zone_offset_minutes = 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Bag size at which the external representation is used.
    #[serde(default = "default_link_bag_threshold")]
    pub link_bag_threshold: usize,
    /// Database time zone, minutes east of UTC.
    #[serde(default)]
    pub time_zone_offset_minutes: i32,
}

fn default_link_bag_threshold() -> usize {
    DEFAULT_LINK_BAG_THRESHOLD
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            link_bag_threshold: DEFAULT_LINK_BAG_THRESHOLD,
            time_zone_offset_minutes: 0,
        }
    }
}

impl CodecConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docwire codec configuration
#
# Bags at or above this size are written with the external representation.
link_bag_threshold = 40

# Database time zone used for DATE values, in minutes east of UTC.
# DATE values are stored as whole days in this zone.
time_zone_offset_minutes = 0
"#
    }

    /// Parse and validate a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CodecConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse codec config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.link_bag_threshold == 0 {
            return Err(Error::InvalidConfig(
                "link_bag_threshold must be at least 1".to_string(),
            ));
        }
        if self.time_zone_offset_minutes.abs() > MAX_TIME_ZONE_OFFSET_MINUTES {
            return Err(Error::InvalidConfig(format!(
                "time_zone_offset_minutes {} is outside +/-{}",
                self.time_zone_offset_minutes, MAX_TIME_ZONE_OFFSET_MINUTES
            )));
        }
        Ok(())
    }

    /// Database time zone as a fixed offset.
    pub fn time_zone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.time_zone_offset_minutes * 60).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "time_zone_offset_minutes {} is not a valid offset",
                self.time_zone_offset_minutes
            ))
        })
    }
}
