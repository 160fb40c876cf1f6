// SPDX-License-Identifier: AGPL-3.0-or-later
//! CSV to Excel (XLSX) converter using rust_xlsxwriter

use super::delimited::{parse_records, sniff_delimiter};
use crate::config::ExcelConfig;
use crate::format::FormatTag;
use crate::traits::{ensure_readable, ConversionError, Converter, Result};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Writes each CSV row into one worksheet row, one text cell per field
pub struct CsvToExcelConverter {
    sheet_name: String,
}

impl CsvToExcelConverter {
    pub fn new(config: &ExcelConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
        }
    }

    /// Build the workbook for a CSV document
    pub fn build_workbook(&self, text: &str) -> Result<Workbook> {
        if text.trim().is_empty() {
            return Err(ConversionError::EmptyInput);
        }

        let delimiter = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .map(sniff_delimiter)
            .unwrap_or(',');

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (row, record) in parse_records(text, delimiter).iter().enumerate() {
            let row = u32::try_from(row).map_err(|_| too_large("rows"))?;
            for (col, field) in record.iter().enumerate() {
                let col = u16::try_from(col).map_err(|_| too_large("columns"))?;
                worksheet.write_string(row, col, field.as_str())?;
            }
        }

        Ok(workbook)
    }
}

fn too_large(what: &str) -> ConversionError {
    ConversionError::InvalidInput(format!("CSV has too many {what} for a worksheet"))
}

impl Default for CsvToExcelConverter {
    fn default() -> Self {
        Self::new(&ExcelConfig::default())
    }
}

impl Converter for CsvToExcelConverter {
    fn name(&self) -> &str {
        "CSV to Excel Converter"
    }

    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        from == FormatTag::Csv && to == FormatTag::Excel
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_readable(input)?;
        let text = std::fs::read_to_string(input)?;
        let mut workbook = self.build_workbook(&text)?;
        workbook.save(output)?;
        Ok(())
    }
}
