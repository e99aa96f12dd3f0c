//! Change detection for case content.
//!
//! Queries the git working-tree status scoped to the content root and
//! produces the ordered set of changed paths. The baseline is whatever git
//! reports against HEAD: modified, added, staged-but-uncommitted, and
//! untracked files all count; deletions are excluded because there is
//! nothing left to copy.

use crate::error::Result;
use crate::models::ChangeSet;
use git2::{Repository, Status, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Enumerates changed files under a content root of a git repository.
pub struct ChangeDetector {
    repo_root: PathBuf,
    /// Content root, relative to the repository root, `/`-separated
    /// (e.g. `public/cases`).
    content_root: String,
}

impl ChangeDetector {
    pub fn new(repo_root: impl Into<PathBuf>, content_root: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            content_root: content_root.into().trim_end_matches('/').to_string(),
        }
    }

    /// Detect files under the content root that differ from the baseline.
    ///
    /// Paths in the result stay relative to the repository root to preserve
    /// traceability to the source-control history. Fails with a
    /// [`ChangeDetection`](crate::error::Error::ChangeDetection) error when
    /// the repository metadata is inaccessible — fatal, no best-effort
    /// fallback.
    pub fn detect(&self) -> Result<ChangeSet> {
        let repo = Repository::open(&self.repo_root)?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .pathspec(&self.content_root);

        let statuses = repo.statuses(Some(&mut opts))?;

        let prefix = format!("{}/", self.content_root);
        let mut paths = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                // Non-UTF-8 path; the content tree is UTF-8 named throughout.
                continue;
            };
            if !path.starts_with(&prefix) {
                continue;
            }
            if !is_copyable_change(entry.status()) {
                continue;
            }
            debug!("changed: {} ({:?})", path, entry.status());
            paths.push(path.to_string());
        }

        info!(
            "detected {} changed files under {}",
            paths.len(),
            self.content_root
        );
        Ok(ChangeSet::new(paths))
    }

    /// The content root joined onto the repository root.
    pub fn content_dir(&self) -> PathBuf {
        self.repo_root.join(Path::new(&self.content_root))
    }
}

/// Statuses that leave a file on disk worth copying.
fn is_copyable_change(status: Status) -> bool {
    status.intersects(
        Status::WT_NEW
            | Status::WT_MODIFIED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE
            | Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE,
    ) && !status.intersects(Status::WT_DELETED | Status::INDEX_DELETED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    /// Init a repository with a committed content tree.
    fn setup_repo(dir: &TempDir) -> Repository {
        let repo = Repository::init(dir.path()).unwrap();

        let cases = dir.path().join("public/cases/憲法/1.総論");
        fs::create_dir_all(&cases).unwrap();
        fs::write(cases.join("1.1-38.js"), "export default { title: 'A' };\n").unwrap();
        fs::write(
            dir.path().join("public/cases/憲法/目次.js"),
            "export default [];\n",
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "readme\n").unwrap();

        {
            let mut index = repo.index().unwrap();
            index
                .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
                .unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = Signature::now("test", "test@example.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn test_clean_tree_yields_empty_set() {
        let dir = TempDir::new().unwrap();
        setup_repo(&dir);

        let detector = ChangeDetector::new(dir.path(), "public/cases");
        assert!(detector.detect().unwrap().is_empty());
    }

    #[test]
    fn test_modified_and_untracked_files_detected() {
        let dir = TempDir::new().unwrap();
        setup_repo(&dir);

        fs::write(
            dir.path().join("public/cases/憲法/1.総論/1.1-38.js"),
            "export default { title: 'A changed' };\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("public/cases/憲法/新判例.js"),
            "export default { title: 'new' };\n",
        )
        .unwrap();

        let detector = ChangeDetector::new(dir.path(), "public/cases");
        let changes = detector.detect().unwrap();

        assert_eq!(changes.len(), 2);
        assert!(changes
            .iter()
            .any(|p| p == "public/cases/憲法/1.総論/1.1-38.js"));
        assert!(changes.iter().any(|p| p == "public/cases/憲法/新判例.js"));
    }

    #[test]
    fn test_paths_outside_content_root_excluded() {
        let dir = TempDir::new().unwrap();
        setup_repo(&dir);

        fs::write(dir.path().join("README.md"), "changed readme\n").unwrap();

        let detector = ChangeDetector::new(dir.path(), "public/cases");
        assert!(detector.detect().unwrap().is_empty());
    }

    #[test]
    fn test_deleted_files_excluded() {
        let dir = TempDir::new().unwrap();
        setup_repo(&dir);

        fs::remove_file(dir.path().join("public/cases/憲法/目次.js")).unwrap();

        let detector = ChangeDetector::new(dir.path(), "public/cases");
        assert!(detector.detect().unwrap().is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let dir = TempDir::new().unwrap();
        setup_repo(&dir);

        fs::write(
            dir.path().join("public/cases/憲法/1.総論/1.1-38.js"),
            "x\n",
        )
        .unwrap();
        fs::write(dir.path().join("public/cases/憲法/新判例.js"), "y\n").unwrap();

        let detector = ChangeDetector::new(dir.path(), "public/cases");
        let first = detector.detect().unwrap();
        let second = detector.detect().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_not_a_repository_is_fatal() {
        let dir = TempDir::new().unwrap();
        let detector = ChangeDetector::new(dir.path(), "public/cases");
        let err = detector.detect().unwrap_err();
        assert!(matches!(err, crate::error::Error::ChangeDetection(_)));
    }
}
