// SPDX-License-Identifier: AGPL-3.0-or-later
//! Unifile Core - Conversion registry, format detection and dispatch
//!
//! This crate provides:
//! - A closed format vocabulary (CSV, JSON, XML, EXCEL, TEXT, PDF)
//! - Extension and content based format detection
//! - A pair-keyed registry of converter plugins
//! - A dispatcher that runs one conversion and reports a structured outcome
//! - Built-in converters and an audit log for the command line front end

pub mod audit;
pub mod config;
pub mod converters;
pub mod detect;
pub mod dispatch;
pub mod format;
pub mod traits;
pub mod util;

pub use audit::{AuditRecord, ConversionLog, CsvAuditLog, MemoryAuditLog, NullLog};
pub use config::{ConvertConfig, OutputCleanup};
pub use detect::{detect_format, FormatDetector};
pub use dispatch::{
    ConversionOutcome, ConversionRequest, ConversionStatus, DispatchError, Dispatcher,
};
pub use format::{ConversionKey, FormatTag};
pub use traits::{ConversionError, Converter, ConverterRegistry, Result};
