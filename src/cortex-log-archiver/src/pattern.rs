//! Parsing of archive file name patterns into a wildcard matcher.
//!
//! A rendered archive file name carries exactly one brace-delimited region,
//! e.g. `app-{yyyyMMdd}.log` or `app.{###}.log`. The region stands for the
//! part that changes from one rolled file to the next; everything around it
//! is matched literally.

use regex::Regex;

use crate::{ArchiveError, Result};

/// Matcher derived from an archive file name pattern.
#[derive(Debug, Clone)]
pub struct ArchivePatternSpec {
    prefix: String,
    suffix: String,
    wildcard_start: usize,
    wildcard_end: usize,
    extension: String,
    matcher: Regex,
}

impl ArchivePatternSpec {
    /// Parse a file name (no directory part) such as `app-{yyyy-MM-dd}.log`.
    pub fn parse(file_name: &str) -> Result<Self> {
        let (start, end) = match (file_name.find('{'), file_name.find('}')) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => return Err(ArchiveError::InvalidPattern(file_name.to_string())),
        };

        // The extension has to follow the placeholder, otherwise the dot
        // belongs to the placeholder text or the prefix.
        let dot = match file_name[end..].rfind('.') {
            Some(offset) => end + offset,
            None => return Err(ArchiveError::MissingExtension(file_name.to_string())),
        };
        let extension = &file_name[dot + 1..];
        if extension.trim().is_empty() {
            return Err(ArchiveError::MissingExtension(file_name.to_string()));
        }

        let prefix = &file_name[..start];
        let suffix = &file_name[end + 1..dot];
        let expression = format!(
            "(?s)^{}.*{}$",
            regex::escape(prefix),
            regex::escape(suffix)
        );
        let matcher = Regex::new(&expression)
            .map_err(|_| ArchiveError::InvalidPattern(file_name.to_string()))?;

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            wildcard_start: start,
            wildcard_end: end,
            extension: extension.to_string(),
            matcher,
        })
    }

    /// Literal text before the placeholder.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Literal text between the placeholder and the extension.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Byte index of `{` in the pattern; the wildcard is inserted here.
    pub fn wildcard_start(&self) -> usize {
        self.wildcard_start
    }

    /// Byte index of `}` in the pattern.
    pub fn wildcard_end(&self) -> usize {
        self.wildcard_end
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check a bare file name against the pattern.
    ///
    /// The stem must be `prefix<anything>suffix` and the extension must equal
    /// the pattern's extension, ignoring ASCII case.
    pub fn matches(&self, file_name: &str) -> bool {
        let Some(dot) = file_name.rfind('.') else {
            return false;
        };
        let (stem, extension) = (&file_name[..dot], &file_name[dot + 1..]);
        extension.eq_ignore_ascii_case(&self.extension) && self.matcher.is_match(stem)
    }
}
