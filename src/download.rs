//! Promotion of finished downloads to their parser-expected names.
//!
//! The happy path renames an exact file reported by the browser's download
//! events. `promote_newest` is the fallback when no event arrives: it picks
//! the most recently modified entry of the output directory, which is only
//! safe while a single collector session writes there.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::CollectorError;

/// Renames a known download to the target path. An existing target is
/// overwritten.
pub fn promote(source: &Path, target: &Path) -> Result<PathBuf, CollectorError> {
    fs::rename(source, target)?;
    info!("download renamed: {:?} -> {:?}", source, target);
    Ok(target.to_path_buf())
}

/// Renames the most recently modified entry of `dir` to `target`.
///
/// Ties on modification time keep the first entry seen. An empty directory
/// is an error: the caller expected a download to have landed.
pub fn promote_newest(dir: &Path, target: &Path) -> Result<PathBuf, CollectorError> {
    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let modified = entry.metadata()?.modified()?;
        debug!("candidate {:?} modified {:?}", entry.path(), modified);
        match &newest {
            Some((_, best)) if modified <= *best => {}
            _ => newest = Some((entry.path(), modified)),
        }
    }

    let (path, _) = newest.ok_or_else(|| {
        CollectorError::Download(format!("no downloaded file found in {}", dir.display()))
    })?;
    promote(&path, target)
}

/// Checks the post-condition of a collection step: the renamed spreadsheet
/// must exist as a regular file.
pub fn verify_exists(target: &Path) -> Result<(), CollectorError> {
    match fs::metadata(target) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(CollectorError::Download(format!(
            "{} exists but is not a regular file",
            target.display()
        ))),
        Err(_) => Err(CollectorError::Download(format!(
            "download not completed, {} does not exist",
            target.display()
        ))),
    }
}
