use chrono::Utc;
use serde::Serialize;

use crate::store::{Store, StoreError};

/// Aggregate counters for the stats surface.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_words: u64,
    pub total_clusters: u64,
    pub pairs_reviewed: u64,
    pub pairs_due: u64,
    pub pairs_active: u64,
    pub pairs_mastered: u64,
    pub question_bank_size: u64,
    pub questions_ready: u64,
    pub total_sessions: u64,
    pub total_answers: u64,
    pub total_correct: u64,
    pub accuracy: f64,
}

impl Store {
    pub fn get_stats(&self) -> Result<Stats, StoreError> {
        let now = Utc::now();
        let progress = self.get_all_progress()?;

        let pairs_reviewed = progress.len() as u64;
        let pairs_mastered = progress.iter().filter(|p| p.archived).count() as u64;
        let pairs_active = pairs_reviewed - pairs_mastered;
        let pairs_due = progress
            .iter()
            .filter(|p| !p.archived && p.next_review <= now)
            .count() as u64;

        // Lifetime accuracy comes from the progress counters, which are
        // recorded on every answer (session totals are not).
        let total_correct: u64 = progress.iter().map(|p| p.total_correct).sum();
        let total_answers: u64 = progress
            .iter()
            .map(|p| p.total_correct + p.total_incorrect)
            .sum();
        let accuracy = if total_answers > 0 {
            (total_correct as f64 / total_answers as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Ok(Stats {
            total_words: self.count_words()?,
            total_clusters: self.count_clusters()?,
            pairs_reviewed,
            pairs_due,
            pairs_active,
            pairs_mastered,
            question_bank_size: self.count_questions()?,
            questions_ready: self.ready_question_count()? as u64,
            total_sessions: self.count_sessions()?,
            total_answers,
            total_correct,
            accuracy,
        })
    }
}
