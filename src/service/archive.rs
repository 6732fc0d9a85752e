//! Report archive
//!
//! Each report is written as one pretty-printed JSON file named after its
//! generation time and teams. Writes are atomic and never overwrite: the
//! payload goes to a temporary file in the target directory which is then
//! hard-linked to its final name, so a name clash fails instead of
//! replacing an earlier report and readers never see a partial file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::model::{ArchiveEntry, ArchivePayload, Report};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("Archive file already exists: {}", .0.display())]
    Collision(PathBuf),

    #[error("Failed to write {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

impl StorageError {
    fn write_failed(path: &Path, error: impl std::fmt::Display) -> Self {
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }
}

/// Writes reports into an output directory
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a report, failing if its file name is already taken
    pub async fn persist(&self, report: &Report) -> Result<ArchiveEntry, StorageError> {
        let filename = archive_filename(report);
        let path = self.dir.join(&filename);
        let saved_at = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let payload = ArchivePayload::from_report(report, saved_at);

        let body = serde_json::to_vec_pretty(&payload)
            .map_err(|e| StorageError::write_failed(&path, e))?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_new_file(&dir, &target, &body))
            .await
            .map_err(|e| StorageError::write_failed(&path, e))??;

        tracing::info!(path = %path.display(), "Report archived");

        Ok(ArchiveEntry {
            filename,
            path,
            payload,
        })
    }
}

/// Removes the temporary file on every exit path
struct TempFileGuard<'a>(&'a Path);

impl Drop for TempFileGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(self.0)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::debug!(path = %self.0.display(), error = %e, "Failed to remove temporary archive file");
        }
    }
}

fn write_new_file(dir: &Path, target: &Path, body: &[u8]) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::write_failed(dir, e))?;

    if target.exists() {
        return Err(StorageError::Collision(target.to_path_buf()));
    }

    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
    let _guard = TempFileGuard(&temp);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .map_err(|e| StorageError::write_failed(&temp, e))?;
    file.write_all(body)
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::write_failed(&temp, e))?;
    drop(file);

    match fs::hard_link(&temp, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(StorageError::Collision(target.to_path_buf()))
        }
        Err(e) => Err(StorageError::write_failed(target, e)),
    }
}

/// `YYYYmmdd_HHMMSS_<home>_vs_<away>.json`, timestamp in UTC
pub fn archive_filename(report: &Report) -> String {
    let record = report.source_record();
    format!(
        "{}_{}_vs_{}.json",
        report.generated_at().format("%Y%m%d_%H%M%S"),
        slugify(record.home_team()),
        slugify(record.away_team())
    )
}

/// File-name-safe form of a team name
///
/// Letters (including accented ones), digits, `-` and `.` are kept; any
/// other run of characters becomes a single `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_alphanumeric() || c == '-' || c == '.' {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    let slug = slug.trim_matches(|c| c == '_' || c == '.');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}
