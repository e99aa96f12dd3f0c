//! Data models for the progress and backup core.
//!
//! This module contains the persisted score-table structures and the
//! change-set / snapshot types produced by the backup pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Derived familiarity label for an article/paragraph, recomputed from the
/// correct-answer ratio on every recorded attempt.
///
/// Serialized with the labels the quiz UI displays, so the documents stay
/// readable by the existing front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedRank {
    /// Correct ratio below 0.4.
    #[default]
    #[serde(rename = "まだまだ")]
    KeepTrying,
    /// Correct ratio in [0.4, 0.8).
    #[serde(rename = "あと少し")]
    Almost,
    /// Correct ratio of 0.8 or better.
    #[serde(rename = "カンペキ")]
    Perfect,
}

impl SpeedRank {
    /// Derive a rank from answered/correct counts.
    pub fn from_counts(answered: u64, correct: u64) -> Self {
        if answered == 0 {
            return SpeedRank::KeepTrying;
        }
        let ratio = correct as f64 / answered as f64;
        if ratio >= 0.8 {
            SpeedRank::Perfect
        } else if ratio >= 0.4 {
            SpeedRank::Almost
        } else {
            SpeedRank::KeepTrying
        }
    }
}

impl fmt::Display for SpeedRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedRank::KeepTrying => write!(f, "まだまだ"),
            SpeedRank::Almost => write!(f, "あと少し"),
            SpeedRank::Perfect => write!(f, "カンペキ"),
        }
    }
}

/// How many raw scores are retained in [`AttemptAggregate::recent_scores`].
pub const RECENT_SCORE_CAP: usize = 3;

/// Running statistics for one (article, paragraph) across all recorded
/// attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAggregate {
    /// Number of attempts recorded.
    pub answered: u64,
    /// Number of attempts judged correct. Invariant: `correct <= answered`.
    pub correct: u64,
    /// Accumulated score across all attempts (caller-defined scale).
    pub total_score: f64,
    /// `total_score / answered`, 0 when no attempts; stored rounded to two
    /// decimals and recomputed from the accumulators on every update.
    pub average_score: f64,
    /// Module identifiers associated with attempts. De-duplicated on insert,
    /// first-seen order preserved.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Raw scores of the most recent attempts, capped at
    /// [`RECENT_SCORE_CAP`] entries (oldest dropped first).
    #[serde(default)]
    pub recent_scores: Vec<f64>,
    /// Familiarity label derived from the correct ratio.
    #[serde(default)]
    pub speed_rank: SpeedRank,
    /// When the aggregate was last mutated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl AttemptAggregate {
    /// Fraction of attempts judged correct (0 when nothing answered).
    pub fn correct_ratio(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64
        }
    }
}

/// Paragraph-number (string key, numeric semantics) to aggregate.
pub type ParagraphTable = BTreeMap<String, AttemptAggregate>;

/// One persisted score document: all aggregates for a single law.
///
/// Shape on disk: `{ "lawName": ..., "articles": { art: { para: agg } } }`.
/// The document must round-trip exactly through parse/serialize (modulo key
/// ordering) to stay readable by external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawScoreTable {
    /// Statute identifier, e.g. `民法`.
    pub law_name: String,
    /// Article-number (string key, numeric semantics) to paragraph table.
    #[serde(default)]
    pub articles: BTreeMap<String, ParagraphTable>,
}

impl LawScoreTable {
    /// Create an empty table for a law.
    pub fn empty(law_name: impl Into<String>) -> Self {
        Self {
            law_name: law_name.into(),
            articles: BTreeMap::new(),
        }
    }

    /// Total attempts recorded across all articles and paragraphs.
    pub fn total_answered(&self) -> u64 {
        self.articles
            .values()
            .flat_map(|paragraphs| paragraphs.values())
            .map(|agg| agg.answered)
            .sum()
    }

    /// Total correct attempts across all articles and paragraphs.
    pub fn total_correct(&self) -> u64 {
        self.articles
            .values()
            .flat_map(|paragraphs| paragraphs.values())
            .map(|agg| agg.correct)
            .sum()
    }

    /// Number of (article, paragraph) pairs with at least one attempt.
    pub fn paragraph_count(&self) -> usize {
        self.articles.values().map(|p| p.len()).sum()
    }
}

/// One quiz-attempt event to fold into an aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    /// Whether the attempt was judged correct.
    pub correct: bool,
    /// Score earned by the attempt (non-negative; the aggregator trusts the
    /// caller-supplied value regardless of correctness).
    pub score: f64,
    /// Optional module identifier to associate with the aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

/// Ordered set of repo-root-relative paths under the content root whose
/// content differs from the version-control baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    paths: Vec<String>,
}

impl ChangeSet {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.paths.iter()
    }
}

impl From<Vec<String>> for ChangeSet {
    fn from(paths: Vec<String>) -> Self {
        Self::new(paths)
    }
}

/// One file successfully mapped (and, outside dry runs, copied) into a
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Source path, relative to the repository root.
    pub source: String,
    /// Where the copy lives (or would live) under the snapshot directory.
    pub destination: PathBuf,
}

/// A single-file copy failure. Non-fatal to the batch.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    /// Source path, relative to the repository root.
    pub source: String,
    /// Why the copy failed.
    pub reason: String,
}

/// Report of one archive run. Immutable once produced; outside dry runs each
/// entry is a byte-exact copy of the source at capture time.
#[derive(Debug, Clone)]
pub struct BackupSnapshot {
    /// Creation time, ISO-8601 with path-unsafe characters replaced. Also the
    /// snapshot directory name when no explicit destination was given.
    pub timestamp: String,
    /// Directory the snapshot was (or would be) written under.
    pub destination: PathBuf,
    /// Successfully mapped/copied files.
    pub entries: Vec<SnapshotEntry>,
    /// Per-file copy failures.
    pub failures: Vec<CopyFailure>,
    /// True when no filesystem writes were performed.
    pub dry_run: bool,
}

impl BackupSnapshot {
    /// True when at least one copy was attempted and every one failed.
    pub fn all_failed(&self) -> bool {
        self.entries.is_empty() && !self.failures.is_empty()
    }
}
