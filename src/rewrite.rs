//! Workflow file discovery and in-place rewriting.
//!
//! Each file is read whole, handed to a fix function, and written back only
//! when the fix reports a change. Writes are atomic (tempfile + fsync +
//! rename), so a file is either fully rewritten or untouched. A failure on one
//! file is recorded and the remaining files are still processed.

use std::error::Error as StdError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory names skipped during discovery unless configured otherwise.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[".git", "node_modules"];

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pin actions in {path}")]
    Fix {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to search for workflow files")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Compute changes without writing them.
    pub dry_run: bool,
}

/// A file whose content the fix function changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub original: String,
    pub updated: String,
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: RewriteError,
}

/// Outcome of a rewrite over a set of files.
#[derive(Debug, Default)]
pub struct RewriteSummary {
    pub changed: Vec<FileChange>,
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl RewriteSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.changed.len() + self.unchanged.len() + self.failures.len()
    }
}

/// All `.yml`/`.yaml` files below `root`, skipping directories whose name is
/// in `ignore_dirs`. Sorted for stable output.
pub fn find_workflow_files(
    root: &Path,
    ignore_dirs: &[String],
) -> Result<Vec<PathBuf>, RewriteError> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let skip = entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| ignore_dirs.iter().any(|d| d == name));
        if skip {
            debug!(path = %entry.path().display(), "skipping directory");
        }
        !skip
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_workflow_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_workflow_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

/// Apply `fix` to each file in `paths`, writing back the ones that change.
///
/// `fix` receives the full file text and returns the new text plus whether
/// anything changed.
pub fn rewrite<F, E>(paths: &[PathBuf], options: &RewriteOptions, mut fix: F) -> RewriteSummary
where
    F: FnMut(&str) -> Result<(String, bool), E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let mut summary = RewriteSummary::default();

    for path in paths {
        debug!(path = %path.display(), "processing file");
        match process_file(path, options.dry_run, &mut fix) {
            Ok(Some(change)) => {
                info!(path = %path.display(), dry_run = options.dry_run, "file updated");
                summary.changed.push(change);
            }
            Ok(None) => summary.unchanged.push(path.clone()),
            Err(error) => summary.failures.push(FileFailure {
                path: path.clone(),
                error,
            }),
        }
    }

    summary
}

fn process_file<F, E>(path: &Path, dry_run: bool, fix: &mut F) -> Result<Option<FileChange>, RewriteError>
where
    F: FnMut(&str) -> Result<(String, bool), E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let original = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (updated, changed) = fix(&original).map_err(|e| RewriteError::Fix {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    if !changed {
        return Ok(None);
    }

    if !dry_run {
        atomic_write(path, updated.as_bytes()).map_err(|source| RewriteError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(Some(FileChange {
        path: path.to_path_buf(),
        original,
        updated,
    }))
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The temp file lives in the target's directory so the rename stays on one
/// filesystem. The target's permissions carry over to the new file.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
