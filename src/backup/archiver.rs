//! Snapshot archiving.
//!
//! Copies a detected change set into a timestamped backup directory,
//! mirroring each file's layout relative to the content root. A failed copy
//! is recorded and the batch continues; only setup failures (for example an
//! uncreatable destination root) abort the run.

use crate::error::{Error, Result};
use crate::models::{BackupSnapshot, ChangeSet, CopyFailure, SnapshotEntry};
use chrono::{SecondsFormat, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options for one archive run.
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Compute and log the mapping without writing anything.
    pub dry_run: bool,
    /// Explicit destination directory (relative paths resolve against the
    /// repository root). When absent a timestamped directory is created under
    /// the default backup root.
    pub destination: Option<PathBuf>,
    /// Show a progress bar while copying.
    pub show_progress: bool,
}

/// Copies changed content files into snapshot directories.
pub struct SnapshotArchiver {
    repo_root: PathBuf,
    /// Content root relative to the repository root, `/`-separated.
    content_root: String,
    /// Default backup root relative to the repository root.
    backup_root: PathBuf,
}

impl SnapshotArchiver {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        content_root: impl Into<String>,
        backup_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo_root: repo_root.into(),
            content_root: content_root.into().trim_end_matches('/').to_string(),
            backup_root: backup_root.into(),
        }
    }

    /// Archive every file of the change set.
    ///
    /// Re-running with the same change set and an explicit destination
    /// overwrites the copies identically, so a failed run is safe to retry.
    /// An auto-timestamped destination yields a fresh snapshot per call.
    pub fn archive(&self, changes: &ChangeSet, options: &ArchiveOptions) -> Result<BackupSnapshot> {
        let timestamp = snapshot_timestamp();
        let destination = match &options.destination {
            Some(dest) if dest.is_absolute() => dest.clone(),
            Some(dest) => self.repo_root.join(dest),
            None => self.repo_root.join(&self.backup_root).join(&timestamp),
        };

        if !options.dry_run {
            fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;
        }

        let progress = if options.show_progress && !options.dry_run && changes.len() > 1 {
            let pb = ProgressBar::new(changes.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for source in changes.iter() {
            let Some(relative) = self.content_relative(source) else {
                // The detector only reports paths under the content root, so
                // this means the change set came from somewhere else.
                warn!("skipping {}: not under {}", source, self.content_root);
                failures.push(CopyFailure {
                    source: source.clone(),
                    reason: format!("not under content root {}", self.content_root),
                });
                if let Some(ref pb) = progress {
                    pb.inc(1);
                }
                continue;
            };
            let dest_path = destination.join(relative);

            if options.dry_run {
                debug!("[dry-run] would copy {} -> {}", source, dest_path.display());
                entries.push(SnapshotEntry {
                    source: source.clone(),
                    destination: dest_path,
                });
                continue;
            }

            match self.copy_one(source, &dest_path) {
                Ok(()) => {
                    debug!("copied {} -> {}", source, dest_path.display());
                    entries.push(SnapshotEntry {
                        source: source.clone(),
                        destination: dest_path,
                    });
                }
                Err(reason) => {
                    warn!("failed to copy {}: {}", source, reason);
                    failures.push(CopyFailure {
                        source: source.clone(),
                        reason,
                    });
                }
            }

            // Advance only once the copy attempt has resolved, so the bar
            // never shows a file as done while its copy can still fail.
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        Ok(BackupSnapshot {
            timestamp,
            destination,
            entries,
            failures,
            dry_run: options.dry_run,
        })
    }

    /// Strip the content root off a repo-root-relative path.
    ///
    /// Explicit relativization against the configured root, not a fixed
    /// segment drop, so a nested or renamed content root keeps working.
    fn content_relative<'a>(&self, source: &'a str) -> Option<&'a Path> {
        Path::new(source)
            .strip_prefix(Path::new(&self.content_root))
            .ok()
    }

    fn copy_one(&self, source: &str, dest_path: &Path) -> std::result::Result<(), String> {
        let src_path = self.repo_root.join(source);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("mkdir {} failed: {e}", parent.display()))?;
        }
        fs::copy(&src_path, dest_path)
            .map_err(|e| format!("copy {} failed: {e}", src_path.display()))?;
        Ok(())
    }
}

/// ISO-8601 creation time with path-unsafe characters replaced, suitable as
/// a directory name. Two runs within the same millisecond may collide; that
/// is an accepted limitation.
fn snapshot_timestamp() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}
