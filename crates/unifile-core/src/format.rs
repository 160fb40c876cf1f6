// SPDX-License-Identifier: AGPL-3.0-or-later
//! Format tags and conversion keys
//!
//! The format vocabulary is closed: every converter, the detector and the
//! registry speak in terms of [`FormatTag`]. `Unknown` is a sentinel used by
//! detection only and never forms part of a [`ConversionKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::traits::ConversionError;

/// File format classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormatTag {
    Csv,
    Json,
    Xml,
    Excel,
    Text,
    Pdf,
    Unknown,
}

impl FormatTag {
    /// All real formats, in registry probe order
    pub const ALL: [Self; 6] = [
        Self::Csv,
        Self::Json,
        Self::Xml,
        Self::Excel,
        Self::Text,
        Self::Pdf,
    ];

    /// Upper-case display name
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Excel => "EXCEL",
            Self::Text => "TEXT",
            Self::Pdf => "PDF",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Preferred extension for files written in this format
    pub const fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Csv => Some("csv"),
            Self::Json => Some("json"),
            Self::Xml => Some("xml"),
            Self::Excel => Some("xlsx"),
            Self::Text => Some("txt"),
            Self::Pdf => Some("pdf"),
            Self::Unknown => None,
        }
    }

    /// Map a file extension (without the dot) to its candidate format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "xlsx" | "xls" => Some(Self::Excel),
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for FormatTag {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.label().eq_ignore_ascii_case(trimmed))
            .or_else(|| Self::from_extension(trimmed))
            .ok_or_else(|| ConversionError::UnknownFormat(trimmed.to_string()))
    }
}

/// Ordered `(from, to)` pair identifying one conversion direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversionKey {
    pub from: FormatTag,
    pub to: FormatTag,
}

impl ConversionKey {
    /// Build a key; `None` for identical sides or the `Unknown` sentinel
    pub fn new(from: FormatTag, to: FormatTag) -> Option<Self> {
        if from == to || !from.is_known() || !to.is_known() {
            return None;
        }
        Some(Self { from, to })
    }

    /// Every valid key over the closed format set
    pub fn all() -> impl Iterator<Item = Self> {
        FormatTag::ALL
            .into_iter()
            .flat_map(|from| FormatTag::ALL.into_iter().filter_map(move |to| Self::new(from, to)))
    }
}

impl fmt::Display for ConversionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_TO_{}", self.from, self.to)
    }
}
