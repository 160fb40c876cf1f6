// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for converters, the audit log and the dispatcher
//!
//! All sections are optional in the TOML file; missing keys fall back to
//! the defaults below.

use crate::traits::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub audit: AuditConfig,
    pub output: OutputConfig,
    pub json: JsonConfig,
    pub xml: XmlConfig,
    pub excel: ExcelConfig,
    pub pdf: PdfConfig,
}

impl ConvertConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| ConversionError::ConfigError(e.to_string()))
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Audit log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Delimited log file, created on first write
    pub path: PathBuf,
    /// Default number of records shown by `recent` queries
    pub recent_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("conversion_log.csv"),
            recent_limit: 20,
        }
    }
}

/// What the dispatcher does with output left behind by a failed converter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputCleanup {
    /// Delete the output only if the failed attempt created it
    #[default]
    RemoveCreated,
    /// Leave whatever the converter wrote
    Keep,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub cleanup: OutputCleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub pretty: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    pub root_element: String,
    /// Element name for members of a top-level array
    pub item_element: String,
    /// Spaces per nesting level (0 = no indentation)
    pub indent: usize,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            root_element: "root".to_string(),
            item_element: "item".to_string(),
            indent: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcelConfig {
    pub sheet_name: String,
}

impl Default for ExcelConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Data".to_string(),
        }
    }
}

/// Page geometry in PDF points (1/72 inch); defaults to A4
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub font_size: f32,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            page_width: 595.0,
            page_height: 842.0,
            margin: 50.0,
        }
    }
}

impl PdfConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let usable_width = self.page_width - 2.0 * self.margin;
        let usable_height = self.page_height - 2.0 * self.margin;
        if self.font_size <= 0.0 || usable_width < self.font_size || usable_height < self.font_size {
            return Err(ConversionError::PdfError(format!(
                "page {}x{} with margin {} cannot fit {}pt text",
                self.page_width, self.page_height, self.margin, self.font_size
            )));
        }
        Ok(())
    }
}
