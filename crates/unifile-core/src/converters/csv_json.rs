// SPDX-License-Identifier: AGPL-3.0-or-later
//! CSV to JSON converter

use super::delimited::{parse_records, sniff_delimiter};
use crate::config::JsonConfig;
use crate::format::FormatTag;
use crate::traits::{ensure_readable, ConversionError, Converter, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Converts a CSV table into a JSON array of objects keyed by the header row
pub struct CsvToJsonConverter {
    pretty: bool,
}

impl CsvToJsonConverter {
    pub fn new(config: &JsonConfig) -> Self {
        Self {
            pretty: config.pretty,
        }
    }
}

impl Default for CsvToJsonConverter {
    fn default() -> Self {
        Self::new(&JsonConfig::default())
    }
}

impl Converter for CsvToJsonConverter {
    fn name(&self) -> &str {
        "CSV to JSON Converter"
    }

    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        from == FormatTag::Csv && to == FormatTag::Json
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_readable(input)?;
        let text = std::fs::read_to_string(input)?;
        let json = csv_to_json(&text)?;

        let mut writer = BufWriter::new(File::create(output)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, &json)?;
        } else {
            serde_json::to_writer(&mut writer, &json)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Build the JSON array for a CSV document.
///
/// With a header row, each following row becomes an object of string values
/// (cells past the shorter of header and row are dropped). A lone row
/// becomes a single object keyed `field1..fieldN`.
pub fn csv_to_json(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Err(ConversionError::EmptyInput);
    }

    let delimiter = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(sniff_delimiter)
        .unwrap_or(',');
    let rows: Vec<Vec<String>> = parse_records(text, delimiter)
        .into_iter()
        .map(|row| row.into_iter().map(|f| f.trim().to_string()).collect())
        .collect();

    let Some((header, data)) = rows.split_first() else {
        return Err(ConversionError::InvalidInput(
            "no valid data found in CSV file".to_string(),
        ));
    };

    let objects = if data.is_empty() {
        let object: Map<String, Value> = header
            .iter()
            .enumerate()
            .map(|(i, value)| (format!("field{}", i + 1), Value::String(value.clone())))
            .collect();
        vec![Value::Object(object)]
    } else {
        data.iter()
            .map(|row| {
                let object: Map<String, Value> = header
                    .iter()
                    .zip(row)
                    .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect()
    };

    Ok(Value::Array(objects))
}
