//! Directory scan for previously rolled log files.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pattern::ArchivePatternSpec;
use crate::{ArchiveError, Result};

/// A rolled log file that is ready to be archived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateFile {
    pub full_path: PathBuf,
    pub name: String,
    pub extension: String,
}

impl CandidateFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Some(Self {
            full_path: path,
            name,
            extension,
        })
    }
}

/// Find the files in `dir` (non-recursive) that match `spec`.
///
/// An empty or blank directory means there is no rollover history yet and
/// yields no candidates. The order of the returned files is unspecified.
pub fn find_candidates(dir: &Path, spec: &ArchivePatternSpec) -> Result<Vec<CandidateFile>> {
    if dir.as_os_str().to_string_lossy().trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| ArchiveError::DirectoryScan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        // Follows symlinks, so a linked rolled file is still a candidate.
        if !entry.path().is_file() {
            continue;
        }
        let matched = entry
            .file_name()
            .to_str()
            .is_some_and(|name| spec.matches(name));
        if !matched {
            continue;
        }
        if let Some(candidate) = CandidateFile::from_path(entry.path()) {
            candidates.push(candidate);
        }
    }

    debug!(
        dir = %dir.display(),
        found = candidates.len(),
        "Scanned for rolled log files"
    );
    Ok(candidates)
}
