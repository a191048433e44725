use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// SRS state for one (word, cluster) pair.
///
/// A pair with no row is *new*; `archived = false` is *active*;
/// `archived = true` is *mastered* and excluded from rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordProgress {
    pub word: String,
    pub cluster_title: String,
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub repetitions: u32,
    pub next_review: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub total_correct: u64,
    pub total_incorrect: u64,
    pub archived: bool,
}

impl Store {
    pub fn get_word_progress(
        &self,
        word: &str,
        cluster_title: &str,
    ) -> Result<Option<WordProgress>, StoreError> {
        let key = keys::progress_key(word, cluster_title);
        match self.word_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite the SRS fields for a pair, bumping the correct /
    /// incorrect counters per the `correct` flag. `last_review` is set to now.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_word_progress(
        &self,
        word: &str,
        cluster_title: &str,
        easiness_factor: f64,
        interval_days: f64,
        repetitions: u32,
        next_review: DateTime<Utc>,
        correct: bool,
    ) -> Result<WordProgress, StoreError> {
        let key = keys::progress_key(word, cluster_title);
        let now = Utc::now();

        let mut progress = match self.word_progress.get(key.as_bytes())? {
            Some(raw) => Self::deserialize::<WordProgress>(&raw)?,
            None => WordProgress {
                word: word.to_string(),
                cluster_title: cluster_title.to_string(),
                easiness_factor,
                interval_days,
                repetitions,
                next_review,
                last_review: None,
                total_correct: 0,
                total_incorrect: 0,
                archived: false,
            },
        };

        progress.easiness_factor = easiness_factor;
        progress.interval_days = interval_days;
        progress.repetitions = repetitions;
        progress.next_review = next_review;
        progress.last_review = Some(now);
        if correct {
            progress.total_correct += 1;
        } else {
            progress.total_incorrect += 1;
        }

        self.word_progress
            .insert(key.as_bytes(), Self::serialize(&progress)?)?;
        Ok(progress)
    }

    /// Manual archive / restore. Restore preserves the SRS state.
    pub fn set_word_archived(
        &self,
        word: &str,
        cluster_title: &str,
        archived: bool,
    ) -> Result<(), StoreError> {
        let key = keys::progress_key(word, cluster_title);
        let raw = self
            .word_progress
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::not_found("word_progress", &key))?;
        let mut progress: WordProgress = Self::deserialize(&raw)?;
        progress.archived = archived;
        self.word_progress
            .insert(key.as_bytes(), Self::serialize(&progress)?)?;
        Ok(())
    }

    /// Reset SRS so the pair becomes due again tomorrow.
    pub fn reset_word_due(&self, word: &str, cluster_title: &str) -> Result<(), StoreError> {
        let key = keys::progress_key(word, cluster_title);
        let raw = self
            .word_progress
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::not_found("word_progress", &key))?;
        let mut progress: WordProgress = Self::deserialize(&raw)?;
        progress.interval_days = 1.0;
        progress.repetitions = 0;
        progress.next_review = Utc::now() + Duration::days(1);
        self.word_progress
            .insert(key.as_bytes(), Self::serialize(&progress)?)?;
        Ok(())
    }

    pub fn get_all_progress(&self) -> Result<Vec<WordProgress>, StoreError> {
        let mut rows = Vec::new();
        for item in self.word_progress.iter() {
            let (_, v) = item?;
            rows.push(Self::deserialize::<WordProgress>(&v)?);
        }
        Ok(rows)
    }

    /// Active (non-archived) pairs, soonest-due first.
    pub fn get_active_pairs(&self) -> Result<Vec<WordProgress>, StoreError> {
        let mut rows: Vec<WordProgress> = self
            .get_all_progress()?
            .into_iter()
            .filter(|p| !p.archived)
            .collect();
        rows.sort_by(|a, b| a.next_review.cmp(&b.next_review));
        Ok(rows)
    }

    /// Mastered pairs, most recently reviewed first.
    pub fn get_archived_pairs(&self) -> Result<Vec<WordProgress>, StoreError> {
        let mut rows: Vec<WordProgress> = self
            .get_all_progress()?
            .into_iter()
            .filter(|p| p.archived)
            .collect();
        rows.sort_by(|a, b| b.last_review.cmp(&a.last_review));
        Ok(rows)
    }
}
