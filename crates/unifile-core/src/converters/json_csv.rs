// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON to CSV converter

use super::delimited::join_record;
use crate::format::FormatTag;
use crate::traits::{ensure_readable, ConversionError, Converter, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Flattens a JSON array of objects into CSV; columns follow the first object
pub struct JsonToCsvConverter;

impl JsonToCsvConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonToCsvConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for JsonToCsvConverter {
    fn name(&self) -> &str {
        "JSON to CSV Converter"
    }

    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        from == FormatTag::Json && to == FormatTag::Csv
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_readable(input)?;
        let root: Value = serde_json::from_reader(BufReader::new(File::open(input)?))?;
        let csv = json_to_csv(&root)?;
        let mut writer = BufWriter::new(File::create(output)?);
        writer.write_all(csv.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Render the CSV text for a JSON array of objects (empty for an empty array)
pub fn json_to_csv(root: &Value) -> Result<String> {
    let not_table =
        || ConversionError::InvalidInput("input JSON must be an array of objects".to_string());

    let rows = root.as_array().ok_or_else(not_table)?;
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first
        .as_object()
        .ok_or_else(not_table)?
        .keys()
        .map(String::as_str)
        .collect();

    let mut csv = join_record(headers.iter().copied(), ',');
    csv.push('\n');
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|header| row.get(*header).map(cell_text).unwrap_or_default())
            .collect();
        csv.push_str(&join_record(cells.iter().map(String::as_str), ','));
        csv.push('\n');
    }
    Ok(csv)
}

/// Cell text: strings verbatim, null empty, nested values as compact JSON
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
