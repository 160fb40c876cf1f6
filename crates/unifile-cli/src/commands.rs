// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command definitions and handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use unifile_core::util::{
    absolute_path, create_backup, default_output_path, format_duration, format_file_size,
};
use unifile_core::{
    AuditRecord, ConversionLog, ConversionRequest, ConversionStatus, ConvertConfig,
    ConverterRegistry, CsvAuditLog, Dispatcher, FormatDetector, FormatTag, NullLog,
};

/// Unifile - convert files between CSV, JSON, XML, Excel, text and PDF
#[derive(Debug, Parser)]
#[command(name = "unifile", version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a file to another format
    Convert(ConvertArgs),
    /// Print the detected format of each file
    Detect(DetectArgs),
    /// List supported conversions
    Formats(FormatsArgs),
    /// Show recent audit log entries
    Log(LogArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// File to convert
    pub input: PathBuf,

    /// Target format (csv, json, xml, excel, text, pdf)
    #[arg(short, long, value_parser = parse_format)]
    pub to: FormatTag,

    /// Source format; detected from the file when omitted
    #[arg(short, long, value_parser = parse_format)]
    pub from: Option<FormatTag>,

    /// Output path; defaults to the input with the target extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Back up an existing output file before overwriting it
    #[arg(long)]
    pub backup: bool,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FormatsArgs {
    /// Only list targets reachable from this source format
    #[arg(short, long, value_parser = parse_format)]
    pub from: Option<FormatTag>,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Number of entries to show (defaults to the configured limit)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

fn parse_format(value: &str) -> std::result::Result<FormatTag, String> {
    value.parse().map_err(|e: unifile_core::ConversionError| e.to_string())
}

impl Cli {
    /// Run the selected command; `Ok(false)` means the command ran but failed
    pub fn execute(&self) -> Result<bool> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Convert(args) => convert(args, &config),
            Commands::Detect(args) => detect(args),
            Commands::Formats(args) => formats(args, &config),
            Commands::Log(args) => log(args, &config),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConvertConfig> {
    match path {
        Some(path) => ConvertConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ConvertConfig::default()),
    }
}

fn audit_log(config: &ConvertConfig) -> Arc<dyn ConversionLog> {
    if config.audit.enabled {
        Arc::new(CsvAuditLog::new(&config.audit.path))
    } else {
        Arc::new(NullLog)
    }
}

fn dispatcher(config: &ConvertConfig) -> Dispatcher {
    let registry = Arc::new(ConverterRegistry::with_builtin(config));
    Dispatcher::new(registry)
        .with_log(audit_log(config))
        .with_cleanup(config.output.cleanup)
}

/// Convert a file and print the outcome
fn convert(args: &ConvertArgs, config: &ConvertConfig) -> Result<bool> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, args.to));

    let input_path = absolute_path(&args.input);
    let output_path = absolute_path(&output);
    if output_path == input_path {
        let message = "output path is the same as the input";
        tracing::warn!("Refusing to convert {}: {}", input_path.display(), message);
        let source = args
            .from
            .unwrap_or_else(|| FormatDetector::new().detect(&args.input));
        let record = AuditRecord::now(
            input_path.display().to_string(),
            output_path.display().to_string(),
            source.label(),
            args.to.label(),
            ConversionStatus::Failed,
            message,
        );
        if let Err(e) = audit_log(config).record(&record) {
            tracing::warn!("Failed to write audit record: {}", e);
        }
        bail!("Output path is the same as the input: {}", output.display());
    }
    if args.backup && output.is_file() {
        let backup = create_backup(&output)
            .with_context(|| format!("Failed to back up {}", output.display()))?;
        tracing::info!("Backed up {} to {}", output.display(), backup.display());
        println!("Backed up {} to {}", output.display(), backup.display());
    }

    let mut request = ConversionRequest::new(&args.input, &output, args.to);
    request.from = args.from;
    let outcome = dispatcher(config).convert(&request);

    if outcome.is_success() {
        let size = std::fs::metadata(&output)
            .map(|m| format_file_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        println!(
            "{} -> {} ({} to {}, {}, {})",
            args.input.display(),
            output.display(),
            outcome.source,
            args.to,
            size,
            format_duration(outcome.elapsed)
        );
    } else {
        eprintln!(
            "Conversion failed ({} to {}): {}",
            outcome.source,
            args.to,
            outcome.message()
        );
    }
    Ok(outcome.is_success())
}

/// Print the detected format of each file
fn detect(args: &DetectArgs) -> Result<bool> {
    let detector = FormatDetector::new();
    let mut all_known = true;
    for file in &args.files {
        let tag = detector.detect(file);
        all_known &= tag.is_known();
        println!("{}: {}", file.display(), tag);
    }
    Ok(all_known)
}

/// List the conversions the built-in registry supports
fn formats(args: &FormatsArgs, config: &ConvertConfig) -> Result<bool> {
    let registry = ConverterRegistry::with_builtin(config);

    if let Some(from) = args.from {
        let targets = registry.supported_targets(from);
        if targets.is_empty() {
            println!("No conversions from {from}");
            return Ok(false);
        }
        for to in targets {
            println!("{to}");
        }
        return Ok(true);
    }

    for from in registry.supported_sources() {
        for to in registry.supported_targets(from) {
            let name = registry
                .lookup(from, to)
                .map(|c| c.name().to_string())
                .unwrap_or_default();
            println!("{from:<6} -> {to:<6} {name}");
        }
    }
    Ok(true)
}

/// Print recent audit records
fn log(args: &LogArgs, config: &ConvertConfig) -> Result<bool> {
    let limit = args.limit.unwrap_or(config.audit.recent_limit);
    let records = CsvAuditLog::new(&config.audit.path)
        .recent(limit)
        .with_context(|| format!("Failed to read {}", config.audit.path.display()))?;

    if records.is_empty() {
        println!("No conversions logged in {}", config.audit.path.display());
        return Ok(true);
    }
    for record in records {
        let detail = if record.message.is_empty() {
            String::new()
        } else {
            format!(": {}", record.message)
        };
        println!(
            "{} {:<7} {} -> {} ({} to {}){}",
            record.timestamp.format(unifile_core::audit::TIMESTAMP_FORMAT),
            record.status,
            record.input,
            record.output,
            record.from,
            record.to,
            detail
        );
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ConvertConfig {
        let mut config = ConvertConfig::default();
        config.audit.path = dir.path().join("log.csv");
        config
    }

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::parse_from(["unifile", "convert", "in.csv", "--to", "json", "-f", "CSV"]);
        let Commands::Convert(args) = cli.command else {
            panic!("Expected convert");
        };
        assert_eq!(args.to, FormatTag::Json);
        assert_eq!(args.from, Some(FormatTag::Csv));
        assert!(args.output.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["unifile", "convert", "in.csv", "--to", "docx"]).is_err());
    }

    #[test]
    fn test_convert_with_default_output() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let input = dir.path().join("table.csv");
        std::fs::write(&input, "a,b\n1,2\n").unwrap();

        let args = ConvertArgs {
            input: input.clone(),
            to: FormatTag::Json,
            from: None,
            output: None,
            backup: false,
        };
        assert!(convert(&args, &config).unwrap());
        assert!(dir.path().join("table.json").is_file());

        let logged = CsvAuditLog::new(&config.audit.path).recent(5).unwrap();
        assert_eq!(logged.len(), 1);
    }

    #[test]
    fn test_convert_failure_reports_false() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let input = dir.path().join("table.csv");
        std::fs::write(&input, "a,b\n1,2\n").unwrap();

        let args = ConvertArgs {
            input,
            to: FormatTag::Pdf,
            from: None,
            output: None,
            backup: false,
        };
        assert!(!convert(&args, &config).unwrap());
    }

    #[test]
    fn test_backup_before_overwrite() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let input = dir.path().join("notes.txt");
        let output = dir.path().join("notes.pdf");
        std::fs::write(&input, "hello").unwrap();
        std::fs::write(&output, "old").unwrap();

        let args = ConvertArgs {
            input,
            to: FormatTag::Pdf,
            from: None,
            output: Some(output),
            backup: true,
        };
        assert!(convert(&args, &config).unwrap());

        let backups = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("notes_backup_"))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let input = dir.path().join("data.json");
        std::fs::write(&input, "[]").unwrap();
        let args = ConvertArgs {
            input: input.clone(),
            to: FormatTag::Csv,
            from: None,
            output: Some(dir.path().join(".").join("data.json")),
            backup: false,
        };
        assert!(convert(&args, &config).is_err());

        let logged = CsvAuditLog::new(&config.audit.path).recent(5).unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].status, ConversionStatus::Failed);
        assert_eq!(logged[0].from, "JSON");
        assert_eq!(logged[0].input, input.display().to_string());
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "[]");
    }
}
