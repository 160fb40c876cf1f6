// SPDX-License-Identifier: AGPL-3.0-or-later
//! Built-in converter plugins, one per supported direction

pub mod delimited;

pub mod csv_excel;
pub mod csv_json;
pub mod json_csv;
pub mod json_xml;
pub mod text_pdf;

pub use csv_excel::CsvToExcelConverter;
pub use csv_json::CsvToJsonConverter;
pub use json_csv::JsonToCsvConverter;
pub use json_xml::JsonToXmlConverter;
pub use text_pdf::TextToPdfConverter;

use crate::config::ConvertConfig;
use crate::traits::{Converter, ConverterRegistry};
use std::sync::Arc;

/// The built-in converters configured from `config`
pub fn builtin_converters(config: &ConvertConfig) -> Vec<Arc<dyn Converter>> {
    vec![
        Arc::new(CsvToJsonConverter::new(&config.json)),
        Arc::new(JsonToCsvConverter::new()),
        Arc::new(JsonToXmlConverter::new(&config.xml)),
        Arc::new(CsvToExcelConverter::new(&config.excel)),
        Arc::new(TextToPdfConverter::new(&config.pdf)),
    ]
}

/// Register every built-in converter
pub fn register_builtin(registry: &ConverterRegistry, config: &ConvertConfig) {
    for converter in builtin_converters(config) {
        registry.register(converter);
    }
}
