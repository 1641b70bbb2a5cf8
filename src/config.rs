use std::path::Path;

use railquest_core::loading::{RealtimeConfig, RoutingConfig, SpatialConfig};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Engine configuration, usually read from a TOML file.
///
/// Every section and field is optional and falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub spatial: SpatialConfig,
    pub realtime: RealtimeConfig,
    pub routing: RoutingConfig,
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has fields of the wrong type
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
