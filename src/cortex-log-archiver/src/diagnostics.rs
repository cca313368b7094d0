//! Reporting of internal archiver failures.
//!
//! Archiving failures never reach the log writer. They are handed to an
//! [`ErrorReporter`] instead.

use tracing::error;

/// Sink for archiver failures.
///
/// Implementations must not panic and must return quickly; they are called
/// from the writing thread as well as from the background archive thread.
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, message: &str, detail: &str);
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_error(&self, message: &str, detail: &str) {
        error!(detail, "{}", message);
    }
}
