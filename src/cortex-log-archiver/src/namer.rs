//! Resolution of the on-disk name for a new archive.

use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

use crate::config::FALLBACK_DATE_FORMAT;
use crate::date_format::DateFormat;
use crate::{ArchiveError, Result};

static LAST_TICKS: AtomicI64 = AtomicI64::new(0);

/// Nanoseconds since the Unix epoch, strictly increasing within the process.
pub fn next_ticks() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut last = LAST_TICKS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TICKS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Builds archive paths from a naming template like `logs/app-{yyyy-MM-dd}.zip`.
#[derive(Debug, Clone)]
pub struct ArchiveNamer {
    dir: PathBuf,
    head: String,
    tail: String,
    format: Option<DateFormat>,
}

impl ArchiveNamer {
    /// Compile a naming template.
    ///
    /// The file name may contain at most one `{...}` placeholder holding a
    /// date format. An invalid format is replaced by [`FALLBACK_DATE_FORMAT`]
    /// here, once, rather than on every archive run.
    pub fn new(template: &str) -> Result<Self> {
        let path = Path::new(template);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                ArchiveError::Config(format!("archive template '{template}' has no file name"))
            })?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let opens = file_name.matches('{').count();
        let closes = file_name.matches('}').count();
        if opens > 1 || closes > 1 {
            return Err(ArchiveError::Config(format!(
                "archive template '{template}' may contain at most one date placeholder"
            )));
        }

        let (head, tail, format) = match (file_name.find('{'), file_name.find('}')) {
            (None, None) => (file_name.to_string(), String::new(), None),
            (Some(start), Some(end)) if start < end => {
                let source = &file_name[start + 1..end];
                let format = DateFormat::parse(source).unwrap_or_else(|| {
                    warn!(
                        template,
                        format = source,
                        fallback = FALLBACK_DATE_FORMAT,
                        "Invalid archive date format, using fallback"
                    );
                    fallback_format()
                });
                (
                    file_name[..start].to_string(),
                    file_name[end + 1..].to_string(),
                    Some(format),
                )
            }
            _ => {
                return Err(ArchiveError::Config(format!(
                    "archive template '{template}' has an unbalanced placeholder"
                )));
            }
        };

        Ok(Self {
            dir,
            head,
            tail,
            format,
        })
    }

    /// The active date format, if the template has a placeholder.
    pub fn date_format(&self) -> Option<&DateFormat> {
        self.format.as_ref()
    }

    /// The archive path for `now`, before collision handling.
    pub fn path_at(&self, now: &DateTime<Local>) -> PathBuf {
        let stamp = self
            .format
            .as_ref()
            .map(|f| f.format(now))
            .unwrap_or_default();
        self.dir.join(format!("{}{}{}", self.head, stamp, self.tail))
    }

    /// Resolve the path for a new archive using the current local time.
    pub fn resolve(&self) -> PathBuf {
        self.resolve_at(&Local::now())
    }

    /// Resolve the path for a new archive at `now`.
    ///
    /// If a file already exists there, `_<ticks>` is inserted before the
    /// extension. The tick source is high resolution and strictly increasing,
    /// so a single probe is enough in practice.
    pub fn resolve_at(&self, now: &DateTime<Local>) -> PathBuf {
        let path = self.path_at(now);
        if path.exists() {
            disambiguate(&path, next_ticks())
        } else {
            path
        }
    }
}

fn fallback_format() -> DateFormat {
    DateFormat::parse(FALLBACK_DATE_FORMAT).unwrap_or_else(|| unreachable!("fallback is valid"))
}

/// Insert `_<ticks>` between the file stem and the extension.
fn disambiguate(path: &Path, ticks: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, ticks, ext.to_string_lossy()),
        None => format!("{}_{}", stem, ticks),
    };
    path.with_file_name(name)
}
