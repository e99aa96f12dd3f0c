//! Score record store: one JSON document per law.
//!
//! The only supported access pattern is read-modify-write: `load`, mutate via
//! the aggregator, `save`. The store provides no locking — concurrent writers
//! to the same law are not supported and must be serialized by the embedding
//! application.

use crate::error::{Error, Result};
use crate::models::LawScoreTable;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File-backed store of [`LawScoreTable`] documents under a data directory.
pub struct ScoreStore {
    data_dir: PathBuf,
}

impl ScoreStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the document for a law.
    pub fn document_path(&self, law_name: &str) -> PathBuf {
        self.data_dir.join(format!("{law_name}.json"))
    }

    /// Load the score table for a law.
    ///
    /// A missing document is not an error: an empty table carrying the given
    /// law name is returned instead. A present but malformed document fails
    /// fast so corrupt aggregates never propagate.
    pub fn load(&self, law_name: &str) -> Result<LawScoreTable> {
        let path = self.document_path(law_name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no score document for {}, starting empty", law_name);
                return Ok(LawScoreTable::empty(law_name));
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let table: LawScoreTable = serde_json::from_str(&raw)
            .map_err(|e| Error::schema(&path, e.to_string()))?;
        validate_table(&table, &path)?;
        Ok(table)
    }

    /// Persist the score table for a law.
    ///
    /// Writes to a temporary file in the data directory and renames it over
    /// the target, so a failed write never leaves a truncated or mixed-state
    /// document behind.
    pub fn save(&self, law_name: &str, table: &LawScoreTable) -> Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| Error::io(&self.data_dir, e))?;

        let path = self.document_path(law_name);
        let payload = serde_json::to_string_pretty(table)
            .map_err(|e| Error::schema(&path, e.to_string()))?;

        let mut tmp =
            NamedTempFile::new_in(&self.data_dir).map_err(|e| Error::io(&self.data_dir, e))?;
        tmp.write_all(payload.as_bytes())
            .map_err(|e| Error::io(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| Error::io(&path, e.error))?;

        debug!("saved score document: {}", path.display());
        Ok(())
    }

    /// Enumerate the laws with a persisted document (file stems of `*.json`).
    pub fn list_laws(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.data_dir, e)),
        };

        let mut laws = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    laws.push(stem.to_string());
                }
            }
        }
        laws.sort();
        Ok(laws)
    }
}

/// Schema validation at the store boundary.
fn validate_table(table: &LawScoreTable, path: &Path) -> Result<()> {
    if table.law_name.is_empty() {
        return Err(Error::schema(path, "lawName is empty"));
    }
    for (article, paragraphs) in &table.articles {
        for (paragraph, record) in paragraphs {
            let at = format!("articles.{article}.{paragraph}");
            if record.correct > record.answered {
                return Err(Error::schema(
                    path,
                    format!("{at}: correct {} exceeds answered {}", record.correct, record.answered),
                ));
            }
            if record.total_score < 0.0 || !record.total_score.is_finite() {
                return Err(Error::schema(
                    path,
                    format!("{at}: totalScore {} is invalid", record.total_score),
                ));
            }
            if record.average_score < 0.0 || !record.average_score.is_finite() {
                return Err(Error::schema(
                    path,
                    format!("{at}: averageScore {} is invalid", record.average_score),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptAggregate, ParagraphTable};
    use tempfile::TempDir;

    fn sample_table() -> LawScoreTable {
        let mut table = LawScoreTable::empty("民法");
        let mut paragraphs = ParagraphTable::new();
        paragraphs.insert(
            "1".to_string(),
            AttemptAggregate {
                answered: 3,
                correct: 2,
                total_score: 360.0,
                average_score: 120.0,
                modules: vec!["総則/1.js".to_string()],
                recent_scores: vec![190.0, 0.0, 170.0],
                ..Default::default()
            },
        );
        table.articles.insert("196".to_string(), paragraphs);
        table
    }

    #[test]
    fn test_load_missing_returns_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());

        let table = store.load("刑法").unwrap();
        assert_eq!(table.law_name, "刑法");
        assert!(table.articles.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());
        let table = sample_table();

        store.save("民法", &table).unwrap();
        let loaded = store.load("民法").unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path().join("data").join("speed-quiz"));

        store.save("憲法", &sample_table()).unwrap();
        assert!(store.document_path("憲法").exists());
    }

    #[test]
    fn test_save_write_failure_is_io_error_and_leaves_no_document() {
        // Occupy the data-dir path with a regular file so the write cannot
        // proceed.
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("speed-quiz");
        fs::write(&blocked, "not a directory").unwrap();

        let store = ScoreStore::new(&blocked);
        let err = store.save("民法", &sample_table()).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        // Nothing was partially written: the blocking file is untouched and
        // no document appeared.
        assert_eq!(fs::read_to_string(&blocked).unwrap(), "not a directory");
        assert!(!store.document_path("民法").exists());
    }

    #[test]
    fn test_malformed_json_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());
        fs::write(store.document_path("民法"), "{ not json").unwrap();

        let err = store.load("民法").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_correct_exceeding_answered_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());
        let doc = r#"{
            "lawName": "民法",
            "articles": {
                "1": { "1": { "answered": 1, "correct": 5, "totalScore": 0.0, "averageScore": 0.0 } }
            }
        }"#;
        fs::write(store.document_path("民法"), doc).unwrap();

        let err = store.load("民法").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert!(err.to_string().contains("exceeds answered"));
    }

    #[test]
    fn test_legacy_document_without_optional_fields_loads() {
        // Documents generated before recentScores/speedRank existed.
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());
        let doc = r#"{
            "lawName": "会社法",
            "articles": {
                "26": { "1": { "answered": 2, "correct": 1, "totalScore": 150.0, "averageScore": 75.0 } }
            }
        }"#;
        fs::write(store.document_path("会社法"), doc).unwrap();

        let table = store.load("会社法").unwrap();
        let record = &table.articles["26"]["1"];
        assert_eq!(record.answered, 2);
        assert!(record.modules.is_empty());
        assert!(record.recent_scores.is_empty());
    }

    #[test]
    fn test_list_laws() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path());
        store.save("民法", &sample_table()).unwrap();
        store.save("刑法", &LawScoreTable::empty("刑法")).unwrap();

        // Sorted byte order: 刑 (U+5211) precedes 民 (U+6C11).
        assert_eq!(store.list_laws().unwrap(), vec!["刑法", "民法"]);
    }

    #[test]
    fn test_list_laws_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ScoreStore::new(dir.path().join("nowhere"));
        assert!(store.list_laws().unwrap().is_empty());
    }
}
