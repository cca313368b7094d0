//! Configuration for the log archiver.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ArchiveError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default number of rolled files required before an archive run starts.
pub const DEFAULT_FILES_THRESHOLD: usize = 1;

/// Date format used when the archive naming template carries an invalid one.
pub const FALLBACK_DATE_FORMAT: &str = "yyyy-MM-dd_HH-mm-ss";

/// Name of the background thread performing archive runs.
pub const ARCHIVER_THREAD_NAME: &str = "log-archiver";

/// Suffix of the file an archive is written to before it is renamed into place.
pub const TEMP_SUFFIX: &str = ".tmp";

// ============================================================================
// Configuration
// ============================================================================

/// Deflate compression level for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    /// Entries are stored without compression.
    Store,
    Fastest,
    Default,
    #[default]
    Best,
    /// Explicit deflate level, `0..=9`.
    Level(u8),
}

impl CompressionLevel {
    /// Deflate level, or `None` when entries are stored uncompressed.
    pub fn deflate_level(self) -> Option<i64> {
        match self {
            Self::Store | Self::Level(0) => None,
            Self::Fastest => Some(1),
            Self::Default => Some(6),
            Self::Best => Some(9),
            Self::Level(level) => Some(i64::from(level.min(9))),
        }
    }
}

/// Configuration for an archiver instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Path of the archive to create, e.g. `logs/archive/app-{yyyy-MM-dd}.zip`.
    ///
    /// The file name may contain one `{...}` date placeholder.
    pub archive_file_naming_template: String,

    /// How many rolled files must exist before an archive run starts.
    #[serde(
        default = "default_files_threshold",
        deserialize_with = "deserialize_files_threshold"
    )]
    pub files_threshold: usize,

    /// Compression level for archive entries.
    #[serde(default)]
    pub compression_level: CompressionLevel,
}

/// Deserialize files_threshold with validation (must be at least 1).
fn deserialize_files_threshold<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = usize::deserialize(deserializer)?;
    if value == 0 {
        return Err(serde::de::Error::custom(
            "files_threshold must be at least 1",
        ));
    }
    Ok(value)
}

fn default_files_threshold() -> usize {
    DEFAULT_FILES_THRESHOLD
}

impl ArchiverConfig {
    pub fn new(archive_file_naming_template: impl Into<String>) -> Self {
        Self {
            archive_file_naming_template: archive_file_naming_template.into(),
            files_threshold: DEFAULT_FILES_THRESHOLD,
            compression_level: CompressionLevel::default(),
        }
    }

    pub fn with_files_threshold(mut self, files_threshold: usize) -> Self {
        self.files_threshold = files_threshold;
        self
    }

    pub fn with_compression_level(mut self, compression_level: CompressionLevel) -> Self {
        self.compression_level = compression_level;
        self
    }

    /// Load and validate a configuration from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ArchiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.archive_file_naming_template.trim().is_empty() {
            return Err(ArchiveError::Config(
                "archive_file_naming_template must not be empty".to_string(),
            ));
        }
        if self.files_threshold == 0 {
            return Err(ArchiveError::Config(
                "files_threshold must be at least 1".to_string(),
            ));
        }
        if let CompressionLevel::Level(level) = self.compression_level {
            if level > 9 {
                return Err(ArchiveError::Config(format!(
                    "compression level {level} is out of range 0..=9"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ArchiverConfig::new("logs/app-{yyyy-MM-dd}.zip");
        assert_eq!(config.files_threshold, DEFAULT_FILES_THRESHOLD);
        assert_eq!(config.compression_level, CompressionLevel::Best);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_defaults() {
        let config =
            ArchiverConfig::from_toml_str(r#"archive_file_naming_template = "logs/a-{yyyy}.zip""#)
                .unwrap();
        assert_eq!(config.archive_file_naming_template, "logs/a-{yyyy}.zip");
        assert_eq!(config.files_threshold, 1);
        assert_eq!(config.compression_level, CompressionLevel::Best);
    }

    #[test]
    fn test_from_toml_explicit_values() {
        let config = ArchiverConfig::from_toml_str(
            r#"
            archive_file_naming_template = "logs/a.zip"
            files_threshold = 5
            compression_level = { level = 3 }
            "#,
        )
        .unwrap();
        assert_eq!(config.files_threshold, 5);
        assert_eq!(config.compression_level, CompressionLevel::Level(3));

        let config = ArchiverConfig::from_toml_str(
            r#"
            archive_file_naming_template = "logs/a.zip"
            compression_level = "store"
            "#,
        )
        .unwrap();
        assert_eq!(config.compression_level, CompressionLevel::Store);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = ArchiverConfig::from_toml_str(
            r#"
            archive_file_naming_template = "logs/a.zip"
            files_threshold = 0
            "#,
        );
        assert!(matches!(result, Err(ArchiveError::Config(_))));
        assert!(
            ArchiverConfig::new("logs/a.zip")
                .with_files_threshold(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ArchiverConfig::new("  ").validate().is_err());
        assert!(
            ArchiverConfig::new("a.zip")
                .with_compression_level(CompressionLevel::Level(12))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deflate_levels() {
        assert_eq!(CompressionLevel::Store.deflate_level(), None);
        assert_eq!(CompressionLevel::Level(0).deflate_level(), None);
        assert_eq!(CompressionLevel::Fastest.deflate_level(), Some(1));
        assert_eq!(CompressionLevel::Best.deflate_level(), Some(9));
        assert_eq!(CompressionLevel::Level(4).deflate_level(), Some(4));
    }
}
