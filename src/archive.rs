//! Job directory archiving.
//!
//! [`ZipArchiver`] bundles a job directory into `<dir>.zip` next to it. The
//! archive depends only on the files' relative paths and contents: entries
//! are sorted, timestamps are pinned to the zip epoch (1980-01-01) and
//! permissions are fixed, so archiving the same artifact set twice yields
//! byte-identical files.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ArchiveError, Error, Result};

/// Permissions recorded for every archived file
const ENTRY_PERMISSIONS: u32 = 0o644;

/// Bundles a directory into a single retrievable file
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive `source_dir` and return the archive's location.
    async fn archive(&self, source_dir: &Path) -> Result<PathBuf>;
}

/// Deterministic ZIP archiver
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Location of the archive for `source_dir`: a sibling named `<dir>.zip`
    pub fn archive_path(source_dir: &Path) -> PathBuf {
        let mut name: OsString = source_dir.as_os_str().to_os_string();
        name.push(".zip");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, source_dir: &Path) -> Result<PathBuf> {
        if !tokio::fs::metadata(source_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ArchiveError::SourceMissing(source_dir.to_path_buf()).into());
        }

        let source = source_dir.to_path_buf();
        let target = Self::archive_path(source_dir);

        let written = target.clone();
        let entries = tokio::task::spawn_blocking(move || write_zip(&source, &written))
            .await
            .map_err(|e| Error::Other(format!("archive task failed: {}", e)))??;

        info!(archive = %target.display(), entries, "job directory archived");
        Ok(target)
    }
}

/// Write every file under `source` into a zip at `target`, returning the entry count.
fn write_zip(source: &Path, target: &Path) -> Result<usize> {
    let write_err = |reason: String| {
        Error::Archive(ArchiveError::Write {
            path: target.to_path_buf(),
            reason,
        })
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| write_err(format!("failed to walk source: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| write_err(e.to_string()))?;
        files.push((zip_entry_name(relative), entry.path().to_path_buf()));
    }
    // Walk order is per-directory; the archive wants one global order.
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut temp_name = target.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let result = (|| -> Result<()> {
        let file = File::create(&temp_path)
            .map_err(|e| write_err(format!("failed to create archive: {}", e)))?;
        let mut writer = zip::ZipWriter::new(BufWriter::new(file));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(ENTRY_PERMISSIONS);

        for (name, path) in &files {
            debug!(entry = %name, "adding archive entry");
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| write_err(format!("failed to add {}: {}", name, e)))?;
            let mut input = File::open(path)
                .map_err(|e| write_err(format!("failed to read {}: {}", path.display(), e)))?;
            std::io::copy(&mut input, &mut writer)
                .map_err(|e| write_err(format!("failed to write {}: {}", name, e)))?;
        }

        let mut inner = writer
            .finish()
            .map_err(|e| write_err(format!("failed to finish archive: {}", e)))?;
        inner
            .flush()
            .map_err(|e| write_err(format!("failed to flush archive: {}", e)))?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, target)
        .map_err(|e| write_err(format!("failed to move archive into place: {}", e)))?;

    Ok(files.len())
}

/// Relative path with `/` separators, as zip entry names require
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
