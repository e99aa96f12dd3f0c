//! Case-module scanner.
//!
//! Walks the content root and builds an index of case modules (id, category,
//! relative path). File stems collide across categories in practice, so
//! colliding ids are disambiguated with a category prefix on every side of
//! the collision.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for the case scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (without dot).
    pub extensions: Vec<String>,
    /// File names to skip entirely (generated indexes and the like).
    pub ignore_names: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["js".to_string()],
            ignore_names: vec!["index.js".to_string()],
        }
    }
}

/// One case module in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseEntry {
    /// Unique id: the file stem, prefixed with the category when the stem
    /// collides with another category's.
    pub id: String,
    /// The raw file stem.
    pub original_id: String,
    /// Immediate parent directory name under the content root.
    pub category: String,
    /// Path relative to the content root, `/`-separated.
    pub path: String,
}

/// Scans the content root for case modules.
pub struct CaseScanner {
    content_dir: PathBuf,
    config: ScanConfig,
}

impl CaseScanner {
    pub fn new(content_dir: impl Into<PathBuf>, config: ScanConfig) -> Self {
        Self {
            content_dir: content_dir.into(),
            config,
        }
    }

    /// Build the case index. Deterministic: entries are sorted by path.
    pub fn scan(&self) -> Result<Vec<CaseEntry>> {
        if !self.content_dir.is_dir() {
            return Err(Error::io(
                &self.content_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "content root not found"),
            ));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.content_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.matches(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.content_dir)
                .unwrap_or(entry.path());
            let path = to_slash(relative);
            let original_id = entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let category = relative
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            debug!("indexed case module: {} ({})", path, category);
            entries.push(CaseEntry {
                id: original_id.clone(),
                original_id,
                category,
                path,
            });
        }

        disambiguate(&mut entries);
        Ok(entries)
    }

    fn matches(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if self.config.ignore_names.iter().any(|ig| ig == name) {
            return false;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config.extensions.iter().any(|e| e == ext)
    }
}

/// Prefix every side of a stem collision with its category.
fn disambiguate(entries: &mut [CaseEntry]) {
    let mut stem_counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries.iter() {
        *stem_counts.entry(entry.original_id.as_str()).or_insert(0) += 1;
    }
    let collisions: Vec<String> = stem_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(stem, _)| stem.to_string())
        .collect();

    for entry in entries.iter_mut() {
        if collisions.contains(&entry.original_id) {
            warn!(
                "duplicate case id {}: prefixing with category {}",
                entry.original_id, entry.category
            );
            entry.id = format!("{}-{}", entry.category, entry.original_id);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_cases(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("public/cases");
        fs::create_dir_all(root.join("憲法/1.総論")).unwrap();
        fs::create_dir_all(root.join("民法")).unwrap();
        fs::write(root.join("憲法/1.総論/1.1-38.js"), "a").unwrap();
        fs::write(root.join("憲法/目次.js"), "b").unwrap();
        fs::write(root.join("民法/目次.js"), "c").unwrap();
        fs::write(root.join("index.js"), "generated").unwrap();
        fs::write(root.join("民法/notes.txt"), "not a module").unwrap();
        root
    }

    #[test]
    fn test_scan_indexes_modules_only() {
        let dir = TempDir::new().unwrap();
        let root = setup_cases(&dir);

        let scanner = CaseScanner::new(&root, ScanConfig::default());
        let entries = scanner.scan().unwrap();

        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(entries.len(), 3);
        assert!(paths.contains(&"憲法/1.総論/1.1-38.js"));
        // index.js and notes.txt excluded
        assert!(!paths.contains(&"index.js"));
        assert!(!paths.iter().any(|p| p.ends_with(".txt")));
    }

    #[test]
    fn test_duplicate_stems_get_category_prefix_on_both_sides() {
        let dir = TempDir::new().unwrap();
        let root = setup_cases(&dir);

        let scanner = CaseScanner::new(&root, ScanConfig::default());
        let entries = scanner.scan().unwrap();

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"憲法-目次"));
        assert!(ids.contains(&"民法-目次"));
        // Non-colliding stem keeps its raw id.
        assert!(ids.contains(&"1.1-38"));
    }

    #[test]
    fn test_category_is_immediate_parent() {
        let dir = TempDir::new().unwrap();
        let root = setup_cases(&dir);

        let scanner = CaseScanner::new(&root, ScanConfig::default());
        let entries = scanner.scan().unwrap();

        let nested = entries.iter().find(|e| e.original_id == "1.1-38").unwrap();
        assert_eq!(nested.category, "1.総論");
    }

    #[test]
    fn test_missing_content_root_is_error() {
        let dir = TempDir::new().unwrap();
        let scanner = CaseScanner::new(dir.path().join("missing"), ScanConfig::default());
        assert!(scanner.scan().is_err());
    }
}
