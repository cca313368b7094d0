//! Archive run orchestration.
//!
//! A trigger runs synchronously on the writing thread:
//! 1. Enter the gate (a losing caller does no filesystem work)
//! 2. Parse the rendered archive file name pattern
//! 3. Scan its directory for rolled files
//! 4. Check the files threshold
//!
//! The compression itself runs on a dedicated background thread that owns
//! the candidate list and the gate guard.

use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{ARCHIVER_THREAD_NAME, ArchiverConfig, CompressionLevel};
use crate::container::{ArchiveFormat, ZipFormat};
use crate::diagnostics::{ErrorReporter, TracingReporter};
use crate::gate::{CompactionGate, GateGuard};
use crate::namer::ArchiveNamer;
use crate::pattern::ArchivePatternSpec;
use crate::scanner::{CandidateFile, find_candidates};
use crate::target::RenderError;
use crate::{ArchiveError, Result};

/// What a single trigger did.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The archive name could not be rendered; the gate was not touched.
    RenderFailed,
    /// Another archive run holds the gate.
    Busy,
    /// The rendered name is not a usable pattern.
    InvalidPattern,
    /// Not enough rolled files yet.
    BelowThreshold { found: usize },
    /// The background thread could not be started.
    SpawnFailed,
    /// An archive run was started in the background.
    Started(ArchiveJob),
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Take the started job, if any.
    pub fn into_job(self) -> Option<ArchiveJob> {
        match self {
            Self::Started(job) => Some(job),
            _ => None,
        }
    }
}

/// Result of one background archive run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    /// Path of the saved archive.
    pub archive_path: Option<PathBuf>,
    /// Files stored in the saved archive.
    pub files_archived: Vec<PathBuf>,
    /// Files that could not be opened and were left on disk.
    pub files_skipped: Vec<PathBuf>,
    /// Archived files removed from disk.
    pub files_deleted: Vec<PathBuf>,
    /// Any errors encountered (non-fatal).
    pub errors: Vec<String>,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ArchiveReport {
    /// Whether an archive was saved.
    pub fn saved(&self) -> bool {
        self.archive_path.is_some()
    }

    fn add_error(&mut self, error: &ArchiveError) {
        self.errors.push(error.to_string());
    }

    fn finish(mut self, start: Instant) -> Self {
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }
}

/// Handle to a background archive run.
///
/// Dropping the handle detaches the run; it still completes and releases
/// the gate.
#[derive(Debug)]
pub struct ArchiveJob {
    handle: JoinHandle<ArchiveReport>,
}

impl ArchiveJob {
    /// Check if the run has completed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the run completes.
    pub fn wait(self) -> ArchiveReport {
        self.handle.join().unwrap_or_else(|_| ArchiveReport {
            errors: vec!["Archive run panicked".to_string()],
            ..Default::default()
        })
    }
}

/// Archives rolled log files, one run at a time.
///
/// Only the run that entered the gate can release it; the gate is not
/// reachable from outside the crate:
///
/// ```compile_fail
/// use cortex_log_archiver::{ArchiverConfig, Compactor};
///
/// let compactor = Compactor::new(ArchiverConfig::new("logs/a.zip")).unwrap();
/// compactor.gate().exit();
/// ```
pub struct Compactor {
    config: ArchiverConfig,
    namer: Arc<ArchiveNamer>,
    gate: Arc<CompactionGate>,
    reporter: Arc<dyn ErrorReporter>,
    format: Arc<dyn ArchiveFormat>,
}

impl Compactor {
    /// Create a compactor writing zip archives and reporting through `tracing`.
    pub fn new(config: ArchiverConfig) -> Result<Self> {
        config.validate()?;
        let namer = ArchiveNamer::new(&config.archive_file_naming_template)?;
        Ok(Self {
            config,
            namer: Arc::new(namer),
            gate: Arc::new(CompactionGate::new()),
            reporter: Arc::new(TracingReporter),
            format: Arc::new(ZipFormat),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_format(mut self, format: Arc<dyn ArchiveFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn gate(&self) -> &Arc<CompactionGate> {
        &self.gate
    }

    /// Whether an archive run is in progress.
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Check for rolled files and start an archive run if there are enough.
    ///
    /// `rendered` is the archive file name pattern for the current rollover,
    /// e.g. `logs/app.{#}.log`, or the renderer's failure. Never fails and
    /// never blocks on archive I/O; problems go to the error reporter.
    pub fn trigger(&self, rendered: std::result::Result<String, RenderError>) -> TriggerOutcome {
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                report_failure(
                    self.reporter.as_ref(),
                    "Error while rendering archive file name",
                    &ArchiveError::Render(e),
                );
                return TriggerOutcome::RenderFailed;
            }
        };

        let Some(guard) = self.gate.enter() else {
            debug!("Archive run already in progress, skipping");
            return TriggerOutcome::Busy;
        };

        let pattern_path = Path::new(&rendered);
        let dir = pattern_path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = pattern_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let spec = match ArchivePatternSpec::parse(file_name) {
            Ok(spec) => spec,
            Err(e) => {
                report_failure(self.reporter.as_ref(), "Invalid archive file name pattern", &e);
                return TriggerOutcome::InvalidPattern;
            }
        };

        let candidates = find_candidates(dir, &spec).unwrap_or_else(|e| {
            report_failure(self.reporter.as_ref(), "Error while scanning archive directory", &e);
            Vec::new()
        });

        if candidates.len() < self.config.files_threshold {
            debug!(
                found = candidates.len(),
                threshold = self.config.files_threshold,
                "Not enough rolled files to archive"
            );
            return TriggerOutcome::BelowThreshold {
                found: candidates.len(),
            };
        }

        let run = ArchiveRun {
            namer: Arc::clone(&self.namer),
            format: Arc::clone(&self.format),
            reporter: Arc::clone(&self.reporter),
            level: self.config.compression_level,
            candidates,
        };

        // If spawning fails the closure is dropped, and the guard with it.
        let spawned = thread::Builder::new()
            .name(ARCHIVER_THREAD_NAME.to_string())
            .spawn(move || run.execute(guard));

        match spawned {
            Ok(handle) => TriggerOutcome::Started(ArchiveJob { handle }),
            Err(e) => {
                report_failure(
                    self.reporter.as_ref(),
                    "Error while starting archive thread",
                    &ArchiveError::Io(e),
                );
                TriggerOutcome::SpawnFailed
            }
        }
    }
}

fn report_failure(reporter: &dyn ErrorReporter, message: &str, error: &ArchiveError) {
    reporter.report_error(message, &error.to_string());
}

/// Everything one background run needs; owned exclusively by that run.
struct ArchiveRun {
    namer: Arc<ArchiveNamer>,
    format: Arc<dyn ArchiveFormat>,
    reporter: Arc<dyn ErrorReporter>,
    level: CompressionLevel,
    candidates: Vec<CandidateFile>,
}

impl ArchiveRun {
    fn execute(self, _guard: GateGuard) -> ArchiveReport {
        let start = Instant::now();
        let mut report = ArchiveReport::default();
        let target = self.namer.resolve();

        let mut builder = match self.format.create(&target, self.level) {
            Ok(builder) => builder,
            Err(source) => {
                self.fail(
                    &mut report,
                    "Error while creating archive",
                    ArchiveError::ArchiveCreate {
                        path: target,
                        source,
                    },
                );
                return report.finish(start);
            }
        };

        let mut added = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let mut file = match File::open(&candidate.full_path) {
                Ok(file) => file,
                Err(source) => {
                    self.fail(
                        &mut report,
                        "Error while opening file for archive",
                        ArchiveError::FileOpen {
                            path: candidate.full_path.clone(),
                            source,
                        },
                    );
                    report.files_skipped.push(candidate.full_path.clone());
                    continue;
                }
            };

            // A half-written entry leaves the container unusable.
            if let Err(source) = builder.add_entry(&candidate.name, &mut file) {
                self.fail(
                    &mut report,
                    "Error while saving archive",
                    ArchiveError::ArchiveSave {
                        path: target,
                        source,
                    },
                );
                return report.finish(start);
            }
            added.push(candidate.full_path.clone());
        }

        if added.is_empty() {
            debug!(path = %target.display(), "No readable files, archive discarded");
            return report.finish(start);
        }

        match builder.save() {
            Ok(path) => report.archive_path = Some(path),
            Err(source) => {
                self.fail(
                    &mut report,
                    "Error while saving archive",
                    ArchiveError::ArchiveSave {
                        path: target,
                        source,
                    },
                );
                return report.finish(start);
            }
        }

        for path in &added {
            match fs::remove_file(path) {
                Ok(()) => report.files_deleted.push(path.clone()),
                Err(source) => self.fail(
                    &mut report,
                    "Error while deleting archived file",
                    ArchiveError::FileDelete {
                        path: path.clone(),
                        source,
                    },
                ),
            }
        }
        report.files_archived = added;

        let report = report.finish(start);
        info!(
            path = %target.display(),
            files_archived = report.files_archived.len(),
            files_deleted = report.files_deleted.len(),
            files_skipped = report.files_skipped.len(),
            duration_ms = report.duration_ms,
            "Archived rolled log files"
        );
        report
    }

    fn fail(&self, report: &mut ArchiveReport, message: &str, error: ArchiveError) {
        report_failure(self.reporter.as_ref(), message, &error);
        report.add_error(&error);
    }
}
