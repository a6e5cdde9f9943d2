//! Export configuration
//!
//! Everything the exporter needs besides the score itself: encoding
//! metadata, page layout defaults, and export switches. Every section is
//! `#[serde(default)]`, so a YAML file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub encoding: EncodingConfig,
    pub layout: LayoutConfig,
    pub export: ExportOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncodingConfig {
    pub software: String,
    /// Fixed `YYYY-MM-DD` date; today's date when unset and the `chrono` feature is on
    pub encoding_date: Option<String>,
    pub musicxml_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LayoutConfig {
    pub scaling: ScalingConfig,
    pub page: Option<PageLayoutConfig>,
    pub system: Option<SystemLayoutConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScalingConfig {
    pub millimeters: f64,
    pub tenths: f64,
}

/// Page dimensions and margins, in tenths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageLayoutConfig {
    pub height: f64,
    pub width: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemLayoutConfig {
    pub left_margin: f64,
    pub right_margin: f64,
    pub system_distance: f64,
    pub top_system_distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportOptions {
    /// Title of the placeholder document written for an empty score
    pub placeholder_title: String,
    /// Default vertical shift for rests, in staff steps
    pub rest_step_shift: i32,
    pub join_part_staffs: bool,
    /// Spaces per nesting level in the serialized XML, 0 for none
    pub indent: usize,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            software: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            encoding_date: None,
            musicxml_version: "3.1".to_string(),
        }
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self { millimeters: 7.0, tenths: 40.0 }
    }
}

impl Default for PageLayoutConfig {
    fn default() -> Self {
        // US letter at 7mm per 40 tenths
        Self {
            height: 1596.0,
            width: 1233.0,
            left_margin: 70.0,
            right_margin: 70.0,
            top_margin: 70.0,
            bottom_margin: 70.0,
        }
    }
}

impl Default for SystemLayoutConfig {
    fn default() -> Self {
        Self {
            left_margin: 0.0,
            right_margin: 0.0,
            system_distance: 121.0,
            top_system_distance: 70.0,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            placeholder_title: "Untitled".to_string(),
            rest_step_shift: 0,
            join_part_staffs: true,
            indent: 2,
        }
    }
}

impl ExportConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Encoding date to write, if any
    pub fn resolved_encoding_date(&self) -> Option<String> {
        if let Some(date) = &self.encoding.encoding_date {
            return Some(date.clone());
        }
        today()
    }
}

#[cfg(feature = "chrono")]
fn today() -> Option<String> {
    Some(chrono::Local::now().format("%Y-%m-%d").to_string())
}

#[cfg(not(feature = "chrono"))]
fn today() -> Option<String> {
    None
}
