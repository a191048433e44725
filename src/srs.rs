//! SM-2 spaced repetition with overdue credit and the archival policy.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::OVERDUE_DAMPENING;
use crate::store::{Store, StoreError};

/// Apply the SM-2 update.
///
/// quality 0-5:
///   0-1 complete blackout / wrong
///   2   wrong but recognized after reveal
///   3   correct with significant difficulty
///   4   correct with minor hesitation
///   5   instant, perfect recall
///
/// Returns (new_ef, new_interval_days, new_repetitions).
pub fn sm2_update(
    quality: i32,
    easiness_factor: f64,
    interval_days: f64,
    repetitions: u32,
) -> (f64, f64, u32) {
    let quality = quality.clamp(0, 5) as f64;

    let mut new_ef = easiness_factor + (0.1 - (5.0 - quality) * (0.08 + (5.0 - quality) * 0.02));
    if new_ef < 1.3 {
        new_ef = 1.3;
    }

    if quality < 3.0 {
        // Failed: back to square one.
        return (new_ef, 1.0, 0);
    }

    let new_repetitions = repetitions + 1;
    let new_interval = match new_repetitions {
        1 => 1.0,
        2 => 6.0,
        _ => interval_days * new_ef,
    };

    (new_ef, new_interval, new_repetitions)
}

/// Map answer correctness + response time to an SM-2 quality score.
pub fn quality_from_answer(correct: bool, response_time_secs: Option<f64>) -> i32 {
    if !correct {
        return 1;
    }
    match response_time_secs {
        Some(t) if t < 3.0 => 5,
        Some(t) if t < 8.0 => 4,
        Some(_) => 3,
        None => 4,
    }
}

/// Result of recording one review, including the archive decision.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub archived: bool,
    pub reason: String,
    pub interval_days: f64,
    pub archive_threshold: f64,
    pub easiness_factor: f64,
    pub repetitions: u32,
    pub next_review: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SrsEngine {
    store: Arc<Store>,
    archive_interval_days: f64,
}

impl SrsEngine {
    pub fn new(store: Arc<Store>, archive_interval_days: f64) -> Self {
        Self {
            store,
            archive_interval_days,
        }
    }

    pub fn archive_threshold(&self) -> f64 {
        self.archive_interval_days
    }

    /// Record a review of a (word, cluster) pair.
    ///
    /// When the pair is overdue and answered correctly, the scheduled
    /// interval is boosted by half the overdue period before feeding into
    /// SM-2, crediting retention that outlasted the schedule. Wrong answers
    /// still reset to 1 day.
    ///
    /// The pair archives when a correct answer produces an interval at or
    /// beyond the configured threshold.
    pub fn record_review(
        &self,
        word: &str,
        cluster_title: &str,
        quality: i32,
    ) -> Result<ReviewOutcome, StoreError> {
        let now = Utc::now();
        let existing = self.store.get_word_progress(word, cluster_title)?;

        let (ef, mut interval, reps) = match &existing {
            Some(row) => (row.easiness_factor, row.interval_days, row.repetitions),
            None => (2.5, 1.0, 0),
        };

        if quality >= 3 {
            if let Some(row) = &existing {
                let overdue_secs = (now - row.next_review).num_seconds();
                if overdue_secs > 0 {
                    let overdue_days = overdue_secs as f64 / 86_400.0;
                    interval += overdue_days * OVERDUE_DAMPENING;
                }
            }
        }

        let (new_ef, new_interval, new_reps) = sm2_update(quality, ef, interval, reps);
        let next_review = now + Duration::seconds((new_interval * 86_400.0) as i64);
        let correct = quality >= 3;

        self.store.upsert_word_progress(
            word,
            cluster_title,
            new_ef,
            new_interval,
            new_reps,
            next_review,
            correct,
        )?;

        let archived = correct && new_interval >= self.archive_interval_days;
        let reason = if archived {
            let reason = format!("Mastered (interval {:.0} days)", new_interval);
            self.store.set_word_archived(word, cluster_title, true)?;
            reason
        } else {
            String::new()
        };

        Ok(ReviewOutcome {
            archived,
            reason,
            interval_days: (new_interval * 10.0).round() / 10.0,
            archive_threshold: self.archive_interval_days,
            easiness_factor: new_ef,
            repetitions: new_reps,
            next_review,
        })
    }
}
