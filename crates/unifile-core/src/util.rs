// SPDX-License-Identifier: AGPL-3.0-or-later
//! File and time helpers shared by the converters and the CLI

use crate::format::FormatTag;
use crate::traits::{ConversionError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Existing regular file that can be opened for reading
pub fn is_valid_input_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

/// Output path whose parent directory exists
pub fn is_valid_output_file(path: &Path) -> bool {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => true,
        Some(parent) => parent.is_dir(),
        None => false,
    }
}

/// Copy `path` to `<stem>_backup_<millis>.<ext>` in the same directory
pub fn create_backup(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(ConversionError::InvalidInput(format!(
            "cannot back up missing file: {}",
            path.display()
        )));
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_backup_{millis}.{}", ext.to_string_lossy()),
        None => format!("{stem}_backup_{millis}"),
    };

    let backup = path.with_file_name(name);
    std::fs::copy(path, &backup)?;
    tracing::debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Absolute form of `path` (without resolving links), or `path` unchanged
/// when the working directory cannot be read
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Input path with its extension replaced by the target format's
pub fn default_output_path(input: &Path, target: FormatTag) -> PathBuf {
    match target.extension() {
        Some(ext) => input.with_extension(ext),
        None => input.with_extension("out"),
    }
}

/// Human-readable byte count ("512 B", "1.5 KB", "3.0 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Compact duration ("250ms", "12s", "3m 5s", "1h 2m")
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }
    let seconds = duration.as_secs();
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m {}s", seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}
