use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::operations::progress::WordProgress;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    FillBlank,
    BestFit,
    Distinction,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillBlank => "fill_blank",
            Self::BestFit => "best_fit",
            Self::Distinction => "distinction",
        }
    }
}

/// Per-choice annotation, parallel to `Question::choices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDetail {
    pub word: String,
    pub base_word: String,
    pub meaning: String,
    pub distinction: String,
    pub why: String,
}

/// A generated multiple-choice question. Unanswered questions are *ready*;
/// once `answered_at` is set the question is a historical record and is
/// never served again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question_type: QuestionType,
    pub target_word: String,
    pub cluster_title: String,
    pub stem: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub context_sentence: String,
    pub choice_details: Vec<ChoiceDetail>,
    pub generated_at: DateTime<Utc>,
    /// Generation backend identifier, e.g. "ollama/qwen3:8b".
    pub source: String,
    pub answered_at: Option<DateTime<Utc>>,
    pub chosen_index: Option<usize>,
    pub was_correct: Option<bool>,
    pub response_time_ms: Option<u64>,
    pub session_id: Option<i64>,
}

impl Question {
    pub fn is_ready(&self) -> bool {
        self.answered_at.is_none()
    }

    pub fn pair_key(&self) -> (String, String) {
        (
            keys::word_key(&self.target_word),
            keys::cluster_key(&self.cluster_title),
        )
    }
}

/// Ready-question count for one (word, cluster) pair; drives generation
/// targeting.
#[derive(Debug, Clone)]
pub struct PairQuestionCount {
    pub word: String,
    pub cluster_title: String,
    pub ready_count: usize,
}

impl Store {
    pub fn save_question(&self, question: &Question) -> Result<(), StoreError> {
        let key = keys::question_key(&question.id);
        self.questions
            .insert(key.as_bytes(), Self::serialize(question)?)?;
        Ok(())
    }

    pub fn get_question(&self, question_id: &str) -> Result<Option<Question>, StoreError> {
        let key = keys::question_key(question_id);
        match self.questions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn count_questions(&self) -> Result<u64, StoreError> {
        Ok(self.questions.len() as u64)
    }

    /// Record the one-shot answer on a question. Idempotent: the first
    /// answer wins and later calls leave the record untouched.
    pub fn mark_question_answered(
        &self,
        question_id: &str,
        chosen_index: usize,
        was_correct: bool,
        response_time_ms: Option<u64>,
        session_id: i64,
    ) -> Result<(), StoreError> {
        let key = keys::question_key(question_id);
        let raw = self
            .questions
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::not_found("question", question_id))?;
        let mut question: Question = Self::deserialize(&raw)?;

        if question.answered_at.is_some() {
            return Ok(());
        }

        question.answered_at = Some(Utc::now());
        question.chosen_index = Some(chosen_index);
        question.was_correct = Some(was_correct);
        question.response_time_ms = response_time_ms;
        question.session_id = Some(session_id);

        self.questions
            .insert(key.as_bytes(), Self::serialize(&question)?)?;
        Ok(())
    }

    /// All unanswered questions whose (word, cluster) pair is not archived.
    fn ready_questions(&self) -> Result<Vec<Question>, StoreError> {
        let progress = self.progress_map()?;
        let mut ready = Vec::new();
        for item in self.questions.iter() {
            let (_, v) = item?;
            let q: Question = Self::deserialize(&v)?;
            if !q.is_ready() {
                continue;
            }
            if let Some(p) = progress.get(&q.pair_key()) {
                if p.archived {
                    continue;
                }
            }
            ready.push(q);
        }
        Ok(ready)
    }

    pub fn ready_question_count(&self) -> Result<usize, StoreError> {
        Ok(self.ready_questions()?.len())
    }

    fn progress_map(&self) -> Result<HashMap<(String, String), WordProgress>, StoreError> {
        let mut map = HashMap::new();
        for row in self.get_all_progress()? {
            map.insert(
                (keys::word_key(&row.word), keys::cluster_key(&row.cluster_title)),
                row,
            );
        }
        Ok(map)
    }

    /// Ready questions ordered by SRS priority:
    /// 0. active pairs due now (freshly-due first, then random)
    /// 1. new pairs (no progress row), random order
    /// Pairs reviewed but not yet due are excluded.
    pub fn get_session_questions(&self, limit: usize) -> Result<Vec<Question>, StoreError> {
        let progress = self.progress_map()?;
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        let mut due: Vec<(DateTime<Utc>, u64, Question)> = Vec::new();
        let mut fresh: Vec<Question> = Vec::new();

        for q in self.ready_questions()? {
            match progress.get(&q.pair_key()) {
                Some(p) => {
                    if p.next_review <= now {
                        due.push((p.next_review, rng.gen(), q));
                    }
                }
                None => fresh.push(q),
            }
        }

        due.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        fresh.shuffle(&mut rng);

        let mut out: Vec<Question> = due.into_iter().map(|(_, _, q)| q).collect();
        out.extend(fresh);
        out.truncate(limit);
        Ok(out)
    }

    /// Ready questions for active pairs that are due, freshly-due first.
    pub fn get_review_questions(&self, limit: usize) -> Result<Vec<Question>, StoreError> {
        let progress = self.progress_map()?;
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        let mut due: Vec<(DateTime<Utc>, u64, Question)> = Vec::new();
        for q in self.ready_questions()? {
            if let Some(p) = progress.get(&q.pair_key()) {
                if p.next_review <= now {
                    due.push((p.next_review, rng.gen(), q));
                }
            }
        }
        due.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut out: Vec<Question> = due.into_iter().map(|(_, _, q)| q).collect();
        out.truncate(limit);
        Ok(out)
    }

    /// Ready questions for pairs with no review history, in random order.
    pub fn get_new_questions(&self, limit: usize) -> Result<Vec<Question>, StoreError> {
        let progress = self.progress_map()?;
        let mut rng = rand::thread_rng();

        let mut fresh: Vec<Question> = self
            .ready_questions()?
            .into_iter()
            .filter(|q| !progress.contains_key(&q.pair_key()))
            .collect();
        fresh.shuffle(&mut rng);
        fresh.truncate(limit);
        Ok(fresh)
    }

    /// Reinforcement pool: ready questions for words already in rotation
    /// (a progress row exists), excluding the supplied word set.
    pub fn get_active_word_new_questions(
        &self,
        limit: usize,
        exclude_words: &HashSet<String>,
    ) -> Result<Vec<Question>, StoreError> {
        let progress = self.progress_map()?;
        let excluded: HashSet<String> = exclude_words.iter().map(|w| keys::word_key(w)).collect();
        let mut rng = rand::thread_rng();

        let mut out: Vec<Question> = self
            .ready_questions()?
            .into_iter()
            .filter(|q| progress.contains_key(&q.pair_key()))
            .filter(|q| !excluded.contains(&keys::word_key(&q.target_word)))
            .collect();
        out.shuffle(&mut rng);
        out.truncate(limit);
        Ok(out)
    }

    /// Ready-question counts for every (word, cluster) pair from eligible
    /// clusters, excluding archived pairs.
    pub fn get_word_cluster_question_counts(&self) -> Result<Vec<PairQuestionCount>, StoreError> {
        let progress = self.progress_map()?;

        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        for q in self.ready_questions()? {
            *counts.entry(q.pair_key()).or_insert(0) += 1;
        }

        let mut out = Vec::new();
        for cluster in self.get_eligible_clusters()? {
            for entry in &cluster.entries {
                let key = (keys::word_key(&entry.word), keys::cluster_key(&cluster.title));
                if progress.get(&key).is_some_and(|p| p.archived) {
                    continue;
                }
                out.push(PairQuestionCount {
                    word: entry.word.clone(),
                    cluster_title: cluster.title.clone(),
                    ready_count: counts.get(&key).copied().unwrap_or(0),
                });
            }
        }
        Ok(out)
    }

    /// Active pairs (from eligible clusters) with no ready question,
    /// soonest-due first. These are the most urgent generation targets.
    pub fn get_word_clusters_needing_questions(&self) -> Result<Vec<WordProgress>, StoreError> {
        let mut ready_pairs: HashSet<(String, String)> = HashSet::new();
        for q in self.ready_questions()? {
            ready_pairs.insert(q.pair_key());
        }

        let mut cluster_members: HashSet<(String, String)> = HashSet::new();
        for cluster in self.get_eligible_clusters()? {
            for entry in &cluster.entries {
                cluster_members
                    .insert((keys::word_key(&entry.word), keys::cluster_key(&cluster.title)));
            }
        }

        let mut out: Vec<WordProgress> = self
            .get_all_progress()?
            .into_iter()
            .filter(|p| !p.archived)
            .filter(|p| {
                let key = (keys::word_key(&p.word), keys::cluster_key(&p.cluster_title));
                cluster_members.contains(&key) && !ready_pairs.contains(&key)
            })
            .collect();
        out.sort_by(|a, b| a.next_review.cmp(&b.next_review));
        Ok(out)
    }

    /// Pairs with no progress row and no ready question, from eligible
    /// clusters, in randomized order.
    pub fn get_new_word_clusters_without_questions(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let progress = self.progress_map()?;
        let mut ready_pairs: HashSet<(String, String)> = HashSet::new();
        for q in self.ready_questions()? {
            ready_pairs.insert(q.pair_key());
        }

        let mut out = Vec::new();
        for cluster in self.get_eligible_clusters()? {
            for entry in &cluster.entries {
                let key = (keys::word_key(&entry.word), keys::cluster_key(&cluster.title));
                if progress.contains_key(&key) || ready_pairs.contains(&key) {
                    continue;
                }
                out.push((entry.word.clone(), cluster.title.clone()));
            }
        }
        let mut rng = rand::thread_rng();
        out.shuffle(&mut rng);
        out.truncate(limit);
        Ok(out)
    }
}
