// SPDX-License-Identifier: AGPL-3.0-or-later
//! Best-effort format detection from file extension and content
//!
//! The extension picks a candidate format; a cheap content check can then
//! only demote that candidate to [`FormatTag::Unknown`], never switch it to
//! another format. Detection never fails: any I/O problem reads as `Unknown`.

use crate::format::FormatTag;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Minimum size of a plausible spreadsheet file
const EXCEL_MIN_LEN: usize = 8;

/// Stateless file format sniffer
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `path`, or `Unknown` if no determination can be made
    pub fn detect(&self, path: &Path) -> FormatTag {
        if !path.is_file() {
            return FormatTag::Unknown;
        }

        let Some(candidate) = extension_of(path).and_then(FormatTag::from_extension) else {
            return FormatTag::Unknown;
        };

        let confirmed = match candidate {
            FormatTag::Csv => first_line(path)
                .is_some_and(|line| line.contains([',', ';', '\t'])),
            FormatTag::Json => first_non_empty_line(path)
                .is_some_and(|line| line.starts_with('{') || line.starts_with('[')),
            // `<?xml` is covered by the `<` prefix
            FormatTag::Xml => first_non_empty_line(path).is_some_and(|line| line.starts_with('<')),
            FormatTag::Excel => is_excel(path),
            FormatTag::Text => is_text(path),
            FormatTag::Pdf => true,
            FormatTag::Unknown => false,
        };

        let detected = if confirmed { candidate } else { FormatTag::Unknown };
        tracing::trace!("Detected {} as {}", path.display(), detected);
        detected
    }
}

/// Detect with the default detector
pub fn detect_format(path: &Path) -> FormatTag {
    FormatDetector::new().detect(path)
}

/// Extension after the last dot of the file name; a leading dot does not count
fn extension_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[idx + 1..]),
        _ => None,
    }
}

/// First line without its terminator, `None` for empty or unreadable files
fn first_line(path: &Path) -> Option<String> {
    let mut reader = BufReader::new(File::open(path).ok()?);
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// First line with content, trimmed
fn first_non_empty_line(path: &Path) -> Option<String> {
    let reader = BufReader::new(File::open(path).ok()?);
    for line in reader.lines() {
        let line = line.ok()?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

fn is_excel(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut header = Vec::with_capacity(EXCEL_MIN_LEN);
    if file.take(EXCEL_MIN_LEN as u64).read_to_end(&mut header).is_err()
        || header.len() < EXCEL_MIN_LEN
    {
        return false;
    }
    // Legacy .xls files are accepted without a signature match
    if !header.starts_with(b"PK") {
        tracing::trace!("{} has no ZIP signature, assuming legacy workbook", path.display());
    }
    true
}

fn is_text(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut probe = [0u8; 1];
    matches!(file.read(&mut probe), Ok(n) if n > 0)
}
