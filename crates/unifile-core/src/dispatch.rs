// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion dispatcher
//!
//! Resolves a request to a converter and runs it once. Every failure, from
//! missing parameters through converter errors, ends up in the returned
//! [`ConversionOutcome`]; nothing escapes as an error or panic.

use crate::audit::{AuditRecord, ConversionLog, NullLog};
use crate::config::OutputCleanup;
use crate::detect::FormatDetector;
use crate::format::FormatTag;
use crate::traits::{ConversionError, ConverterRegistry};
use crate::util::absolute_path;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Final state of one conversion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionStatus {
    Success,
    Failed,
}

impl ConversionStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for ConversionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(ConversionError::InvalidInput(format!(
                "unknown conversion status: {other}"
            ))),
        }
    }
}

/// Why a conversion attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Input, output or target format missing
    #[error("invalid parameters")]
    InvalidParameters,

    #[error("could not detect input format")]
    UndetectedFormat,

    #[error("no converter available for {from} to {to}")]
    NoConverter { from: FormatTag, to: FormatTag },

    /// Failure reported by the converter itself
    #[error("{message}")]
    Converter { converter: String, message: String },
}

/// One conversion request; absent fields are reported, not assumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Declared source format, `None` to auto-detect
    pub from: Option<FormatTag>,
    pub to: Option<FormatTag>,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, to: FormatTag) -> Self {
        Self {
            input: Some(input.into()),
            output: Some(output.into()),
            from: None,
            to: Some(to),
        }
    }

    pub fn with_source(mut self, from: FormatTag) -> Self {
        self.from = Some(from);
        self
    }
}

/// Result of a single conversion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub status: ConversionStatus,
    /// Declared or detected source, `Unknown` when unresolved
    pub source: FormatTag,
    pub target: Option<FormatTag>,
    /// Name of the converter that ran, if one was found
    pub converter: Option<String>,
    pub error: Option<DispatchError>,
    pub elapsed: Duration,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }

    /// Failure reason, empty on success
    pub fn message(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// Stateless coordinator over a registry, the detector and an audit log
pub struct Dispatcher {
    registry: Arc<ConverterRegistry>,
    detector: FormatDetector,
    log: Arc<dyn ConversionLog>,
    cleanup: OutputCleanup,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        Self {
            registry,
            detector: FormatDetector::new(),
            log: Arc::new(NullLog),
            cleanup: OutputCleanup::default(),
        }
    }

    pub fn with_log(mut self, log: Arc<dyn ConversionLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_cleanup(mut self, cleanup: OutputCleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Shorthand for a fully specified request
    pub fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        from: Option<FormatTag>,
        to: FormatTag,
    ) -> ConversionOutcome {
        let mut request = ConversionRequest::new(input, output, to);
        request.from = from;
        self.convert(&request)
    }

    /// Run one conversion and record its outcome
    pub fn convert(&self, request: &ConversionRequest) -> ConversionOutcome {
        let started = Instant::now();
        let mut outcome = self.dispatch(request);
        outcome.elapsed = started.elapsed();

        match &outcome.error {
            None => tracing::info!(
                "Converted {} ({} -> {})",
                display_path(request.input.as_deref()),
                outcome.source,
                display_target(outcome.target)
            ),
            Some(error) => tracing::warn!(
                "Conversion of {} failed: {}",
                display_path(request.input.as_deref()),
                error
            ),
        }

        self.record(request, &outcome);
        outcome
    }

    fn dispatch(&self, request: &ConversionRequest) -> ConversionOutcome {
        let (Some(input), Some(output), Some(target)) =
            (request.input.as_deref(), request.output.as_deref(), request.to)
        else {
            return failed(
                request.from.unwrap_or(FormatTag::Unknown),
                request.to,
                None,
                DispatchError::InvalidParameters,
            );
        };

        let source = match request.from {
            Some(declared) => declared,
            None => self.detector.detect(input),
        };
        if !source.is_known() {
            return failed(source, Some(target), None, DispatchError::UndetectedFormat);
        }

        let Some(converter) = self.registry.lookup(source, target) else {
            return failed(
                source,
                Some(target),
                None,
                DispatchError::NoConverter {
                    from: source,
                    to: target,
                },
            );
        };

        let name = converter.name().to_string();
        let output_existed = output.exists();
        tracing::debug!("Running {} on {}", name, input.display());

        let result = panic::catch_unwind(AssertUnwindSafe(|| converter.convert(input, output)));
        let message = match result {
            Ok(Ok(())) => {
                return ConversionOutcome {
                    status: ConversionStatus::Success,
                    source,
                    target: Some(target),
                    converter: Some(name),
                    error: None,
                    elapsed: Duration::ZERO,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("converter panicked: {}", panic_message(payload.as_ref())),
        };

        self.clean_up(output, output_existed);
        failed(
            source,
            Some(target),
            Some(name.clone()),
            DispatchError::Converter {
                converter: name,
                message,
            },
        )
    }

    /// Apply the partial-output policy after a converter failure
    fn clean_up(&self, output: &Path, existed_before: bool) {
        if self.cleanup != OutputCleanup::RemoveCreated || existed_before || !output.is_file() {
            return;
        }
        match std::fs::remove_file(output) {
            Ok(()) => tracing::debug!("Removed partial output {}", output.display()),
            Err(e) => tracing::warn!("Could not remove partial output {}: {}", output.display(), e),
        }
    }

    fn record(&self, request: &ConversionRequest, outcome: &ConversionOutcome) {
        let record = AuditRecord::now(
            audit_path(request.input.as_deref()),
            audit_path(request.output.as_deref()),
            outcome.source.label(),
            display_target(outcome.target),
            outcome.status,
            outcome.message(),
        );
        if let Err(e) = self.log.record(&record) {
            tracing::warn!("Failed to write audit record: {}", e);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

fn failed(
    source: FormatTag,
    target: Option<FormatTag>,
    converter: Option<String>,
    error: DispatchError,
) -> ConversionOutcome {
    ConversionOutcome {
        status: ConversionStatus::Failed,
        source,
        target,
        converter,
        error: Some(error),
        elapsed: Duration::ZERO,
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

/// Absolute form for the audit log
fn audit_path(path: Option<&Path>) -> String {
    path.map(|p| absolute_path(p).display().to_string()).unwrap_or_default()
}

fn display_target(target: Option<FormatTag>) -> &'static str {
    target.map_or("", |t| t.label())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::traits::{Converter, Result};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Converter whose behaviour is picked per test
    enum Behaviour {
        Copy,
        PartialWriteThenFail,
        Panic,
    }

    struct Scripted(Behaviour);

    impl Converter for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
            from == FormatTag::Text && to == FormatTag::Pdf
        }

        fn convert(&self, input: &Path, output: &Path) -> Result<()> {
            match self.0 {
                Behaviour::Copy => {
                    std::fs::copy(input, output)?;
                    Ok(())
                }
                Behaviour::PartialWriteThenFail => {
                    std::fs::write(output, "half")?;
                    Err(ConversionError::InvalidInput("malformed input".to_string()))
                }
                Behaviour::Panic => panic!("codec bug"),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        log: Arc<MemoryAuditLog>,
        dispatcher: Dispatcher,
    }

    fn fixture(behaviour: Behaviour) -> Fixture {
        let registry = ConverterRegistry::new();
        registry.register(Arc::new(Scripted(behaviour)));
        let log = Arc::new(MemoryAuditLog::new(16));
        let dispatcher = Dispatcher::new(Arc::new(registry)).with_log(log.clone());
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("in.txt"), "hello").unwrap();
        Fixture { dir, log, dispatcher }
    }

    #[test]
    fn test_missing_target_is_invalid() {
        let fx = fixture(Behaviour::Copy);
        let request = ConversionRequest {
            input: Some(fx.dir.path().join("in.txt")),
            output: Some(fx.dir.path().join("out.pdf")),
            from: Some(FormatTag::Text),
            to: None,
        };

        let outcome = fx.dispatcher.convert(&request);
        assert_eq!(outcome.error, Some(DispatchError::InvalidParameters));
        assert_eq!(outcome.message(), "invalid parameters");
        assert_eq!(outcome.source, FormatTag::Text);
    }

    #[test]
    fn test_missing_paths_report_unknown_source() {
        let fx = fixture(Behaviour::Copy);
        let request = ConversionRequest {
            to: Some(FormatTag::Pdf),
            ..ConversionRequest::default()
        };

        let outcome = fx.dispatcher.convert(&request);
        assert!(!outcome.is_success());
        assert_eq!(outcome.source, FormatTag::Unknown);
        assert_eq!(outcome.error, Some(DispatchError::InvalidParameters));
    }

    #[test]
    fn test_detects_source_when_absent() {
        let fx = fixture(Behaviour::Copy);
        let outcome = fx.dispatcher.convert(&ConversionRequest::new(
            fx.dir.path().join("in.txt"),
            fx.dir.path().join("out.pdf"),
            FormatTag::Pdf,
        ));

        assert!(outcome.is_success(), "{:?}", outcome.error);
        assert_eq!(outcome.source, FormatTag::Text);
        assert_eq!(outcome.converter.as_deref(), Some("scripted"));
    }

    #[test]
    fn test_undetectable_source() {
        let fx = fixture(Behaviour::Copy);
        std::fs::write(fx.dir.path().join("blob.bin"), "data").unwrap();

        let outcome = fx.dispatcher.convert(&ConversionRequest::new(
            fx.dir.path().join("blob.bin"),
            fx.dir.path().join("out.pdf"),
            FormatTag::Pdf,
        ));
        assert_eq!(outcome.error, Some(DispatchError::UndetectedFormat));
        assert_eq!(outcome.message(), "could not detect input format");
    }

    #[test]
    fn test_declared_unknown_is_undetected() {
        let fx = fixture(Behaviour::Copy);
        let request = ConversionRequest::new(
            fx.dir.path().join("in.txt"),
            fx.dir.path().join("out.pdf"),
            FormatTag::Pdf,
        )
        .with_source(FormatTag::Unknown);

        let outcome = fx.dispatcher.convert(&request);
        assert_eq!(outcome.error, Some(DispatchError::UndetectedFormat));
    }

    #[test]
    fn test_routing_error() {
        let fx = fixture(Behaviour::Copy);
        let outcome = fx.dispatcher.convert(
            &ConversionRequest::new(
                fx.dir.path().join("in.txt"),
                fx.dir.path().join("out.csv"),
                FormatTag::Csv,
            )
            .with_source(FormatTag::Text),
        );

        assert_eq!(outcome.message(), "no converter available for TEXT to CSV");
        assert_eq!(outcome.converter, None);
    }

    #[test]
    fn test_converter_error_removes_created_output() {
        let fx = fixture(Behaviour::PartialWriteThenFail);
        let output = fx.dir.path().join("out.pdf");

        let outcome = fx.dispatcher.convert_file(
            &fx.dir.path().join("in.txt"),
            &output,
            Some(FormatTag::Text),
            FormatTag::Pdf,
        );

        assert_eq!(
            outcome.error,
            Some(DispatchError::Converter {
                converter: "scripted".to_string(),
                message: "malformed input".to_string(),
            })
        );
        assert!(!output.exists());
    }

    #[test]
    fn test_converter_error_keeps_preexisting_output() {
        let fx = fixture(Behaviour::PartialWriteThenFail);
        let output = fx.dir.path().join("out.pdf");
        std::fs::write(&output, "previous").unwrap();

        let outcome = fx.dispatcher.convert_file(
            &fx.dir.path().join("in.txt"),
            &output,
            Some(FormatTag::Text),
            FormatTag::Pdf,
        );
        assert!(!outcome.is_success());
        assert!(output.exists());
    }

    #[test]
    fn test_keep_policy_leaves_partial_output() {
        let fx = fixture(Behaviour::PartialWriteThenFail);
        let dispatcher = fx.dispatcher.with_cleanup(OutputCleanup::Keep);
        let output = fx.dir.path().join("out.pdf");

        dispatcher.convert_file(&fx.dir.path().join("in.txt"), &output, None, FormatTag::Pdf);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "half");
    }

    #[test]
    fn test_converter_panic_is_contained() {
        let fx = fixture(Behaviour::Panic);
        let outcome = fx.dispatcher.convert_file(
            &fx.dir.path().join("in.txt"),
            &fx.dir.path().join("out.pdf"),
            None,
            FormatTag::Pdf,
        );

        assert!(!outcome.is_success());
        assert!(outcome.message().contains("codec bug"));
    }

    #[test]
    fn test_every_outcome_is_logged() {
        let fx = fixture(Behaviour::Copy);
        let input = fx.dir.path().join("in.txt");
        let output = fx.dir.path().join("out.pdf");

        fx.dispatcher.convert_file(&input, &output, None, FormatTag::Pdf);
        fx.dispatcher.convert_file(&input, &output, None, FormatTag::Xml);
        fx.dispatcher.convert(&ConversionRequest::default());

        let records = fx.log.recent(10).unwrap();
        let summary: Vec<(ConversionStatus, &str, &str)> = records
            .iter()
            .map(|r| (r.status, r.from.as_str(), r.to.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ConversionStatus::Success, "TEXT", "PDF"),
                (ConversionStatus::Failed, "TEXT", "XML"),
                (ConversionStatus::Failed, "UNKNOWN", ""),
            ]
        );
        assert_eq!(records[1].message, "no converter available for TEXT to XML");
        assert_eq!(records[0].input, input.display().to_string());
    }

    #[test]
    fn test_relative_paths_logged_absolute() {
        let fx = fixture(Behaviour::Copy);
        let request = ConversionRequest::new("missing/in.txt", "missing/out.pdf", FormatTag::Pdf)
            .with_source(FormatTag::Text);

        fx.dispatcher.convert(&request);

        let record = &fx.log.recent(1).unwrap()[0];
        assert!(Path::new(&record.input).is_absolute());
        assert!(record.input.ends_with("in.txt"));
        assert!(Path::new(&record.output).is_absolute());
        assert_eq!(record.status, ConversionStatus::Failed);
    }

    #[test]
    fn test_failing_log_does_not_affect_outcome() {
        struct Broken;
        impl ConversionLog for Broken {
            fn record(&self, _record: &AuditRecord) -> Result<()> {
                Err(ConversionError::InvalidInput("disk full".to_string()))
            }
            fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>> {
                Ok(Vec::new())
            }
        }

        let fx = fixture(Behaviour::Copy);
        let dispatcher = fx.dispatcher.with_log(Arc::new(Broken));
        let outcome = dispatcher.convert_file(
            &fx.dir.path().join("in.txt"),
            &fx.dir.path().join("out.pdf"),
            None,
            FormatTag::Pdf,
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!("SUCCESS".parse::<ConversionStatus>().unwrap(), ConversionStatus::Success);
        assert_eq!(ConversionStatus::Failed.to_string(), "FAILED");
        assert!("ok".parse::<ConversionStatus>().is_err());
    }
}
