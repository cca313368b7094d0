//! Background archiving of rolled-over log files.
//!
//! A log writer rolls its active file over into numbered or dated backups.
//! After every write, the writer hands this crate the rendered archive file
//! name pattern; the archiver scans the directory for previously-rolled files
//! that match it, bundles them into a single zip archive on a background
//! thread and removes the originals.
//!
//! # Features
//!
//! - **Pattern Matching**: `app-{yyyy-MM-dd}.log` becomes a literal prefix/suffix
//!   matcher with an unconstrained middle and a fixed extension
//! - **Single Flight**: at most one archive run per archiver, concurrent triggers are dropped
//! - **Non-blocking**: compression runs on a dedicated thread, never on the writing thread
//! - **Collision Handling**: an existing archive is never overwritten
//! - **Partial Failure Cleanup**: originals are only deleted after the archive was saved
//!
//! # Example
//!
//! ```rust,no_run
//! use cortex_log_archiver::{ArchiverConfig, ArchivingTarget, Compactor, StaticArchiveName};
//!
//! let config = ArchiverConfig::new("logs/archive/app-{yyyy-MM-dd}.zip");
//! let compactor = Compactor::new(config).expect("invalid archiver config");
//! let target = ArchivingTarget::new(compactor, StaticArchiveName::new("logs/app.{#}.log"));
//!
//! // Called by the log writer after each write.
//! target.on_write_completed(&());
//! ```

pub mod compactor;
pub mod config;
pub mod container;
pub mod date_format;
pub mod diagnostics;
pub mod gate;
pub mod namer;
pub mod pattern;
pub mod scanner;
pub mod target;

pub use compactor::{ArchiveJob, ArchiveReport, Compactor, TriggerOutcome};
pub use config::{
    ArchiverConfig, CompressionLevel, DEFAULT_FILES_THRESHOLD, FALLBACK_DATE_FORMAT,
};
pub use container::{ArchiveBuilder, ArchiveFormat, ZipFormat};
pub use diagnostics::{ErrorReporter, TracingReporter};
pub use gate::{CompactionGate, GateGuard};
pub use namer::ArchiveNamer;
pub use pattern::ArchivePatternSpec;
pub use scanner::{CandidateFile, find_candidates};
pub use target::{ArchiveNameRenderer, ArchivingTarget, RenderError, StaticArchiveName};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive file name pattern has invalid format '{0}'")]
    InvalidPattern(String),
    #[error("Archive file name extension missing in '{0}'")]
    MissingExtension(String),
    #[error("Failed to render archive file name: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to scan directory {}: {source}", path.display())]
    DirectoryScan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open {} for archiving: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create archive {}: {source}", path.display())]
    ArchiveCreate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to save archive {}: {source}", path.display())]
    ArchiveSave {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to delete archived file {}: {source}", path.display())]
    FileDelete {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid archiver configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
