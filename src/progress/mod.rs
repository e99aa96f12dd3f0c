//! Progress aggregation.
//!
//! Folds quiz-attempt events into the per-article aggregates of a
//! [`LawScoreTable`]. Pure in-memory mutation; persistence is the score
//! store's job. Recording is NOT idempotent — every call counts as one more
//! attempt, so at-most-once delivery of attempt events is the caller's
//! responsibility.

use crate::error::{Error, Result};
use crate::models::{
    AttemptAggregate, AttemptOutcome, LawScoreTable, SpeedRank, RECENT_SCORE_CAP,
};
use chrono::Utc;
use tracing::debug;

/// Round to two decimal places for storage/display.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A key is a non-empty string of ASCII digits. Article and paragraph
/// numbers carry numeric semantics even though they are stored as strings.
fn validate_number_key(kind: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput(format!("{kind} number is empty")));
    }
    if !key.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "{kind} number {key:?} is not numeric"
        )));
    }
    Ok(())
}

fn validate_outcome(outcome: &AttemptOutcome) -> Result<()> {
    if !outcome.score.is_finite() {
        return Err(Error::InvalidInput("score is not a finite number".to_string()));
    }
    if outcome.score < 0.0 {
        return Err(Error::InvalidInput(format!(
            "score must be non-negative, got {}",
            outcome.score
        )));
    }
    Ok(())
}

/// Fold one attempt into the aggregate for `(article, paragraph)`, creating
/// the aggregate on first attempt.
///
/// The supplied score is added to `total_score` unconditionally — whether an
/// incorrect attempt may earn a partial score is caller policy, not inspected
/// here.
pub fn record_attempt<'a>(
    table: &'a mut LawScoreTable,
    article: &str,
    paragraph: &str,
    outcome: &AttemptOutcome,
) -> Result<&'a AttemptAggregate> {
    validate_number_key("article", article)?;
    validate_number_key("paragraph", paragraph)?;
    validate_outcome(outcome)?;

    let record = table
        .articles
        .entry(article.to_string())
        .or_default()
        .entry(paragraph.to_string())
        .or_default();

    record.answered += 1;
    if outcome.correct {
        record.correct += 1;
    }
    record.total_score += outcome.score;
    record.average_score = round2(record.total_score / record.answered as f64);

    record.recent_scores.push(outcome.score);
    while record.recent_scores.len() > RECENT_SCORE_CAP {
        record.recent_scores.remove(0);
    }

    if let Some(module_id) = outcome.module_id.as_deref() {
        if !record.modules.iter().any(|m| m == module_id) {
            record.modules.push(module_id.to_string());
            debug!(
                "associated module {} with {}条{}項",
                module_id, article, paragraph
            );
        }
    }

    record.speed_rank = SpeedRank::from_counts(record.answered, record.correct);
    record.last_updated = Some(Utc::now());

    debug!(
        "recorded attempt: {}{}条{}項 {} +{} ({}/{}, avg {})",
        table.law_name,
        article,
        paragraph,
        if outcome.correct { "correct" } else { "incorrect" },
        outcome.score,
        record.correct,
        record.answered,
        record.average_score
    );

    Ok(record)
}

/// One line of the `show` summary for a law.
pub fn summarize(table: &LawScoreTable) -> String {
    let answered = table.total_answered();
    let correct = table.total_correct();
    let rate = if answered == 0 {
        0.0
    } else {
        correct as f64 / answered as f64 * 100.0
    };
    format!(
        "{}: {} articles, {} paragraphs, {} answered, {} correct ({:.1}%)",
        table.law_name,
        table.articles.len(),
        table.paragraph_count(),
        answered,
        correct,
        rate
    )
}
