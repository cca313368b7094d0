//! Compressed archive containers.
//!
//! An archive is streamed entry by entry into a temporary file next to its
//! final path and only renamed into place once it is complete:
//! 1. Create `<archive>.tmp`
//! 2. Stream each entry into it
//! 3. Finish the container and sync it to disk (fsync)
//! 4. Rename the temp file to the archive path (atomic on POSIX)
//!
//! A failed run never leaves a file at the archive path.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::{CompressionLevel, TEMP_SUFFIX};

/// Factory for archive builders.
pub trait ArchiveFormat: Send + Sync {
    fn create(&self, path: &Path, level: CompressionLevel) -> io::Result<Box<dyn ArchiveBuilder>>;
}

/// An archive being written.
///
/// Dropping a builder without calling [`save`](ArchiveBuilder::save)
/// discards everything written so far.
pub trait ArchiveBuilder: Send {
    /// Stream `source` into the archive as an entry called `name`.
    fn add_entry(&mut self, name: &str, source: &mut dyn Read) -> io::Result<u64>;

    /// Complete the archive and move it to its final path.
    fn save(self: Box<Self>) -> io::Result<PathBuf>;
}

/// Zip archives with deflate compression and zip64 extensions when needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipFormat;

impl ArchiveFormat for ZipFormat {
    fn create(&self, path: &Path, level: CompressionLevel) -> io::Result<Box<dyn ArchiveBuilder>> {
        let temp_path = temp_path_for(path);
        let file = File::create(&temp_path)?;

        let options = match level.deflate_level() {
            Some(deflate) => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(deflate)),
            None => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        }
        .large_file(true);

        debug!(
            path = %path.display(),
            temp_path = %temp_path.display(),
            "Created zip archive"
        );

        Ok(Box::new(ZipBuilder {
            writer: Some(ZipWriter::new(BufWriter::new(file))),
            options,
            path: path.to_path_buf(),
            temp_path,
        }))
    }
}

struct ZipBuilder {
    writer: Option<ZipWriter<BufWriter<File>>>,
    options: SimpleFileOptions,
    path: PathBuf,
    temp_path: PathBuf,
}

impl ArchiveBuilder for ZipBuilder {
    fn add_entry(&mut self, name: &str, source: &mut dyn Read) -> io::Result<u64> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("archive already closed"))?;
        writer.start_file(name, self.options).map_err(io::Error::other)?;
        io::copy(source, writer)
    }

    fn save(mut self: Box<Self>) -> io::Result<PathBuf> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("archive already closed"))?;

        let mut buffered = writer.finish().map_err(io::Error::other)?;
        buffered.flush()?;
        buffered.get_ref().sync_all()?;
        drop(buffered);

        fs::rename(&self.temp_path, &self.path)?;
        debug!(path = %self.path.display(), "Saved zip archive");
        Ok(self.path.clone())
    }
}

impl Drop for ZipBuilder {
    fn drop(&mut self) {
        // Only unsaved archives still own their temp file.
        if self.temp_path.exists() {
            drop(self.writer.take());
            if let Err(e) = fs::remove_file(&self.temp_path) {
                warn!(
                    error = %e,
                    temp_path = %self.temp_path.display(),
                    "Failed to remove incomplete archive"
                );
            }
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_zip_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("archive.zip");

        let mut builder = ZipFormat.create(&path, CompressionLevel::Best).unwrap();
        builder
            .add_entry("a.log", &mut Cursor::new(b"first".to_vec()))
            .unwrap();
        builder
            .add_entry("b.log", &mut Cursor::new(b"second".to_vec()))
            .unwrap();
        assert!(!path.exists());

        let saved = builder.save().unwrap();
        assert_eq!(saved, path);
        assert!(!temp_path_for(&path).exists());

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("b.log")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_stored_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stored.zip");

        let mut builder = ZipFormat.create(&path, CompressionLevel::Store).unwrap();
        builder
            .add_entry("a.log", &mut Cursor::new(b"plain".to_vec()))
            .unwrap();
        builder.save().unwrap();

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(
            archive.by_name("a.log").unwrap().compression(),
            CompressionMethod::Stored
        );
    }

    #[test]
    fn test_dropped_builder_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abandoned.zip");

        let mut builder = ZipFormat.create(&path, CompressionLevel::Best).unwrap();
        builder
            .add_entry("a.log", &mut Cursor::new(b"data".to_vec()))
            .unwrap();
        drop(builder);

        assert!(!path.exists());
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("archive.zip");
        assert!(ZipFormat.create(&path, CompressionLevel::Best).is_err());
    }
}
