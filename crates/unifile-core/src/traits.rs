// SPDX-License-Identifier: AGPL-3.0-or-later
//! Converter capability trait and the pair-keyed converter registry

use crate::format::{ConversionKey, FormatTag};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Error type for converters and configuration
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("input file is empty")]
    EmptyInput,

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Excel error: {0}")]
    ExcelError(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF error: {0}")]
    PdfError(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// A converter plugin handling one or more `(from, to)` pairs
pub trait Converter: Send + Sync {
    /// Human-readable converter name
    fn name(&self) -> &str;

    /// Whether this converter handles the given direction
    fn supports(&self, from: FormatTag, to: FormatTag) -> bool;

    /// Read `input` and write the converted result to `output`
    fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Fail early when a converter's input is missing or unreadable
pub(crate) fn ensure_readable(input: &Path) -> Result<()> {
    if crate::util::is_valid_input_file(input) {
        Ok(())
    } else {
        Err(ConversionError::InvalidInput(format!(
            "input file does not exist or cannot be read: {}",
            input.display()
        )))
    }
}

/// Registry mapping each conversion direction to a single converter
///
/// Registration is expected once at startup; lookups may run concurrently
/// with a registration in progress.
pub struct ConverterRegistry {
    bindings: DashMap<ConversionKey, Arc<dyn Converter>>,
    /// Every pair bound so far, in registration order (duplicates kept)
    conversions: RwLock<Vec<ConversionKey>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
            conversions: RwLock::new(Vec::new()),
        }
    }

    /// Registry pre-populated with the built-in converters
    pub fn with_builtin(config: &crate::config::ConvertConfig) -> Self {
        let registry = Self::new();
        crate::converters::register_builtin(&registry, config);
        registry
    }

    /// Probe every ordered pair and bind those the converter supports.
    ///
    /// A later registration for the same pair replaces the earlier one.
    /// Returns the number of pairs bound by this call.
    pub fn register(&self, converter: Arc<dyn Converter>) -> usize {
        let mut bound = 0;
        for key in ConversionKey::all() {
            if !converter.supports(key.from, key.to) {
                continue;
            }
            if let Some(previous) = self.bindings.insert(key, Arc::clone(&converter)) {
                tracing::debug!(
                    "{} replaces {} for {}",
                    converter.name(),
                    previous.name(),
                    key
                );
            } else {
                tracing::debug!("Bound {} to {}", key, converter.name());
            }
            self.conversions.write().push(key);
            bound += 1;
        }
        bound
    }

    pub fn lookup(&self, from: FormatTag, to: FormatTag) -> Option<Arc<dyn Converter>> {
        let key = ConversionKey::new(from, to)?;
        self.bindings.get(&key).map(|c| Arc::clone(c.value()))
    }

    /// Formats that appear as the source of any binding
    pub fn supported_sources(&self) -> BTreeSet<FormatTag> {
        self.bindings.iter().map(|entry| entry.key().from).collect()
    }

    /// Formats reachable from `from`
    pub fn supported_targets(&self, from: FormatTag) -> BTreeSet<FormatTag> {
        self.bindings
            .iter()
            .filter(|entry| entry.key().from == from)
            .map(|entry| entry.key().to)
            .collect()
    }

    pub fn is_supported(&self, from: FormatTag, to: FormatTag) -> bool {
        ConversionKey::new(from, to).is_some_and(|key| self.bindings.contains_key(&key))
    }

    /// All registered pairs in registration order.
    ///
    /// Registering the same converter twice lists its pairs twice; lookups
    /// are unaffected since they go by key.
    pub fn supported_conversions(&self) -> Vec<ConversionKey> {
        self.conversions.read().clone()
    }

    /// Number of distinct bound pairs
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("bindings", &self.bindings.len())
            .field("conversions", &self.conversions.read().len())
            .finish()
    }
}
