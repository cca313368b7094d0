//! Glue between a log writer and the [`Compactor`].

use thiserror::Error;

use crate::compactor::{Compactor, TriggerOutcome};

/// The archive file name pattern could not be rendered for an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Renders the archive file name pattern, e.g. `logs/app.{#}.log`, for the
/// rollover context of a log event.
pub trait ArchiveNameRenderer<E: ?Sized>: Send + Sync {
    fn render_archive_name(&self, event: &E) -> Result<String, RenderError>;
}

impl<E, F> ArchiveNameRenderer<E> for F
where
    E: ?Sized,
    F: Fn(&E) -> Result<String, RenderError> + Send + Sync,
{
    fn render_archive_name(&self, event: &E) -> Result<String, RenderError> {
        self(event)
    }
}

/// A pattern that is the same for every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticArchiveName(String);

impl StaticArchiveName {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }
}

impl<E: ?Sized> ArchiveNameRenderer<E> for StaticArchiveName {
    fn render_archive_name(&self, _event: &E) -> Result<String, RenderError> {
        Ok(self.0.clone())
    }
}

/// Archiving hook for a log writer.
pub struct ArchivingTarget<R> {
    compactor: Compactor,
    renderer: R,
}

impl<R> ArchivingTarget<R> {
    pub fn new(compactor: Compactor, renderer: R) -> Self {
        Self {
            compactor,
            renderer,
        }
    }

    pub fn compactor(&self) -> &Compactor {
        &self.compactor
    }

    /// Call after every completed write.
    ///
    /// Returns quickly; an archive run, if one is due, continues in the
    /// background. The outcome may be ignored.
    pub fn on_write_completed<E>(&self, event: &E) -> TriggerOutcome
    where
        E: ?Sized,
        R: ArchiveNameRenderer<E>,
    {
        let rendered = self.renderer.render_archive_name(event);
        self.compactor.trigger(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiverConfig;
    use crate::diagnostics::testing::RecordingReporter;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct LogEvent {
        logger: &'static str,
    }

    fn compactor(dir: &TempDir, reporter: Arc<RecordingReporter>) -> Compactor {
        let template = dir.path().join("archive-{yyyyMMdd}.zip");
        Compactor::new(ArchiverConfig::new(template.to_str().unwrap()))
            .unwrap()
            .with_reporter(reporter)
    }

    #[test]
    fn test_static_name_triggers_archive() {
        let temp_dir = TempDir::new().unwrap();
        let rolled = temp_dir.path().join("app.1.log");
        fs::write(&rolled, "rolled").unwrap();

        let reporter = Arc::new(RecordingReporter::default());
        let pattern = temp_dir.path().join("app.{#}.log");
        let target = ArchivingTarget::new(
            compactor(&temp_dir, reporter.clone()),
            StaticArchiveName::new(pattern.to_str().unwrap()),
        );

        let report = target.on_write_completed(&()).into_job().unwrap().wait();
        assert!(report.saved());
        assert!(!rolled.exists());
        assert_eq!(reporter.len(), 0);
    }

    #[test]
    fn test_closure_renderer_uses_event() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("db.1.log"), "rolled").unwrap();
        fs::write(temp_dir.path().join("http.1.log"), "rolled").unwrap();

        let base = temp_dir.path().to_path_buf();
        let renderer = move |event: &LogEvent| -> Result<String, RenderError> {
            Ok(base
                .join(format!("{}.{{#}}.log", event.logger))
                .to_string_lossy()
                .into_owned())
        };
        let reporter = Arc::new(RecordingReporter::default());
        let target = ArchivingTarget::new(compactor(&temp_dir, reporter), renderer);

        let report = target
            .on_write_completed(&LogEvent { logger: "db" })
            .into_job()
            .unwrap()
            .wait();
        assert_eq!(report.files_archived, vec![temp_dir.path().join("db.1.log")]);
        assert!(temp_dir.path().join("http.1.log").exists());
    }

    #[test]
    fn test_render_failure_is_reported_not_returned() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let renderer =
            |_: &LogEvent| -> Result<String, RenderError> { Err(RenderError::new("bad layout")) };
        let target = ArchivingTarget::new(compactor(&temp_dir, reporter.clone()), renderer);

        let outcome = target.on_write_completed(&LogEvent { logger: "db" });
        assert!(matches!(outcome, TriggerOutcome::RenderFailed));
        assert_eq!(reporter.len(), 1);
        assert!(!target.compactor().is_running());
    }
}
