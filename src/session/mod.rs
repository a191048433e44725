//! Session composition and the answer-processing path.

pub mod snapshot;
pub mod state;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use rand::seq::SliceRandom;
use thiserror::Error;

use crate::audio::{get_or_create_audio, sentence_hash};
use crate::generation::BufferController;
use crate::providers::TtsBackend;
use crate::srs::{quality_from_answer, SrsEngine};
use crate::store::operations::questions::Question;
use crate::store::{Store, StoreError};

use self::snapshot::{
    AnswerWire, ArchiveWire, ProgressSnapshot, ProgressWire, QuestionWire, SessionProgressWire,
    SummaryWire,
};
use self::state::{ActiveSessions, SessionState};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(i64),
    #[error("no question is currently being served")]
    NoCurrentQuestion,
    #[error("selected_index must be between 0 and 3 (got {0})")]
    InvalidChoice(usize),
    #[error("no questions available; import vocabulary first")]
    NoMaterial,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// What the client gets when asking for the next question.
#[derive(Debug)]
pub enum NextOutcome {
    Question(Box<QuestionWire>),
    /// List exhausted but the buffer says more is coming.
    Waiting(ProgressSnapshot),
    /// Session over; totals persisted and state dropped.
    Complete { session_id: i64, summary: SummaryWire },
}

pub struct SessionManager {
    store: Arc<Store>,
    srs: Arc<SrsEngine>,
    buffer: Arc<BufferController>,
    sessions: Arc<ActiveSessions>,
    tts: Option<Arc<dyn TtsBackend>>,
    audio_cache_dir: PathBuf,
    session_size: usize,
    max_review_pool: usize,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        srs: Arc<SrsEngine>,
        buffer: Arc<BufferController>,
        sessions: Arc<ActiveSessions>,
        tts: Option<Arc<dyn TtsBackend>>,
        audio_cache_dir: PathBuf,
        session_size: usize,
        max_review_pool: usize,
    ) -> Self {
        Self {
            store,
            srs,
            buffer,
            sessions,
            tts,
            audio_cache_dir,
            session_size,
            max_review_pool,
        }
    }

    pub fn sessions(&self) -> &Arc<ActiveSessions> {
        &self.sessions
    }

    /// Compose an ordered batch from the three pools: due reviews first,
    /// then new material, then reinforcement, shuffled together at the end.
    fn compose_pool(
        &self,
        exclude_ids: &HashSet<String>,
        exclude_words: &HashSet<String>,
        limit: usize,
    ) -> Result<Vec<Question>, StoreError> {
        let mut ids: HashSet<String> = exclude_ids.clone();
        let mut words: HashSet<String> = exclude_words.clone();
        let mut picked: Vec<Question> = Vec::new();

        fn take(
            pool: Vec<Question>,
            cap: usize,
            ids: &mut HashSet<String>,
            words: &mut HashSet<String>,
            picked: &mut Vec<Question>,
        ) {
            for q in pool {
                if picked.len() >= cap {
                    break;
                }
                let word = q.target_word.to_lowercase();
                if ids.contains(&q.id) || words.contains(&word) {
                    continue;
                }
                ids.insert(q.id.clone());
                words.insert(word);
                picked.push(q);
            }
        }

        // 1. Review pool: every due question, freshly-due first. These may
        //    exceed the soft target; overdue material is never dropped.
        let review = self.store.get_review_questions(self.max_review_pool)?;
        take(review, self.max_review_pool, &mut ids, &mut words, &mut picked);

        // 2. New pool fills toward the target.
        if picked.len() < limit {
            let new = self.store.get_new_questions(limit)?;
            take(new, limit, &mut ids, &mut words, &mut picked);
        }

        // 3. Reinforcement: unseen questions for words already in rotation.
        if picked.len() < limit {
            let reinforcement = self
                .store
                .get_active_word_new_questions(limit, &words)?;
            take(reinforcement, limit, &mut ids, &mut words, &mut picked);
        }

        picked.shuffle(&mut rand::thread_rng());
        Ok(picked)
    }

    /// Start a session and serve its first question.
    pub async fn start(&self) -> Result<NextOutcome, SessionError> {
        let questions = self.compose_pool(&HashSet::new(), &HashSet::new(), self.session_size)?;
        if questions.is_empty() && self.store.count_clusters()? == 0 {
            return Err(SessionError::NoMaterial);
        }

        let row = self.store.start_session()?;
        let state = SessionState::new(row.id, questions, self.session_size);
        let session_id = state.id;
        {
            let mut map = self.sessions.lock().await;
            map.insert(session_id, state);
        }
        tracing::info!(session_id, "Session started");

        self.buffer.check().await;
        self.next_question(session_id).await
    }

    fn progress_wire(&self, state: &SessionState) -> Result<ProgressWire, StoreError> {
        Ok(ProgressWire {
            answered: state.total,
            correct: state.correct,
            ready: self.store.ready_question_count()?,
            target: state.target,
            generating: self.buffer.is_generating(),
            has_next: state.current_index + 1 < state.questions.len(),
        })
    }

    fn progress_snapshot(&self, state: &SessionState) -> Result<ProgressSnapshot, StoreError> {
        Ok(ProgressSnapshot {
            session_id: state.id,
            answered: state.total,
            correct: state.correct,
            remaining: state.remaining(),
            ready: self.store.ready_question_count()?,
            target: state.target,
            generating: self.buffer.is_generating(),
            has_next: !state.is_exhausted() || state.current.is_some(),
            session_complete: false,
        })
    }

    fn summary(state: &SessionState) -> SummaryWire {
        let accuracy = if state.total > 0 {
            (state.correct as f64 / state.total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        SummaryWire {
            total: state.total,
            correct: state.correct,
            accuracy,
        }
    }

    /// Serve the question at the current position. Re-delivers the
    /// already-served snapshot unchanged if one is outstanding, extends
    /// the list from the pools when exhausted, and ends the session when
    /// nothing more is coming.
    pub async fn next_question(&self, session_id: i64) -> Result<NextOutcome, SessionError> {
        let mut map = self.sessions.lock().await;
        let state = map
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        if let Some(served) = &state.current {
            let wire = snapshot::question_wire(served, session_id, self.progress_wire(state)?);
            return Ok(NextOutcome::Question(Box::new(wire)));
        }

        if state.is_exhausted() {
            let extra = self.compose_pool(&state.seen_ids, &state.seen_words, state.target)?;
            if !extra.is_empty() {
                state.absorb(extra);
            }
        }

        if !state.is_exhausted() {
            let question = state.questions[state.current_index].clone();
            let is_new = self
                .store
                .get_word_progress(&question.target_word, &question.cluster_title)?
                .is_none();
            let served = snapshot::serve(question, is_new);
            let wire = snapshot::question_wire(&served, session_id, self.progress_wire(state)?);
            state.current = Some(served);
            return Ok(NextOutcome::Question(Box::new(wire)));
        }

        if self.buffer.is_generating() {
            return Ok(NextOutcome::Waiting(self.progress_snapshot(state)?));
        }

        let summary = Self::summary(state);
        self.store
            .end_session(session_id, state.total, state.correct)?;
        map.remove(&session_id);
        tracing::info!(session_id, "Session ended");
        Ok(NextOutcome::Complete {
            session_id,
            summary,
        })
    }

    /// Resumption snapshot: the outstanding question if one is served,
    /// progress otherwise. Never advances or ends the session.
    pub async fn current(&self, session_id: i64) -> Result<NextOutcome, SessionError> {
        let map = self.sessions.lock().await;
        let state = map
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        match &state.current {
            Some(served) => {
                let wire = snapshot::question_wire(served, session_id, self.progress_wire(state)?);
                Ok(NextOutcome::Question(Box::new(wire)))
            }
            None => Ok(NextOutcome::Waiting(self.progress_snapshot(state)?)),
        }
    }

    /// Progress-stream tick. While the stored list is exhausted this also
    /// polls the pools so freshly generated questions flow into the
    /// session.
    pub async fn progress(&self, session_id: i64) -> Result<ProgressSnapshot, SessionError> {
        let mut map = self.sessions.lock().await;
        let state = map
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        if state.is_exhausted() && state.current.is_none() {
            let extra = self.compose_pool(&state.seen_ids, &state.seen_words, state.target)?;
            if !extra.is_empty() {
                state.absorb(extra);
            }
        }
        Ok(self.progress_snapshot(state)?)
    }

    /// The critical path: grade, update SRS, persist the answer record,
    /// re-check the buffer, then advance.
    pub async fn answer(
        &self,
        session_id: i64,
        selected_index: usize,
        response_time_ms: Option<u64>,
    ) -> Result<AnswerWire, SessionError> {
        // Phase 1: grade and persist under the lock.
        let (served, correct, outcome) = {
            let mut map = self.sessions.lock().await;
            let state = map
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            let served = state.current.take().ok_or(SessionError::NoCurrentQuestion)?;

            if selected_index >= served.question.choices.len() {
                state.current = Some(served);
                return Err(SessionError::InvalidChoice(selected_index));
            }

            let correct = selected_index == served.correct_display_index;
            state.total += 1;
            if correct {
                state.correct += 1;
            }

            let question = &served.question;
            let quality =
                quality_from_answer(correct, response_time_ms.map(|ms| ms as f64 / 1000.0));
            let outcome =
                self.srs
                    .record_review(&question.target_word, &question.cluster_title, quality)?;

            let chosen_stored_index = served
                .display_order
                .get(selected_index)
                .copied()
                .unwrap_or(selected_index);
            self.store.mark_question_answered(
                &question.id,
                chosen_stored_index,
                correct,
                response_time_ms,
                session_id,
            )?;

            state.current_index += 1;
            (served, correct, outcome)
        };

        // Phase 2: narration and buffer re-check, outside the lock. The
        // check needs the sessions map for shortfall, and archival above
        // may have shrunk the ready pool.
        let question = &served.question;
        let audio_hash = match &self.tts {
            Some(tts) => get_or_create_audio(
                &question.context_sentence,
                tts,
                &self.store,
                &self.audio_cache_dir,
            )
            .await
            .map(|_| sentence_hash(&question.context_sentence)),
            None => None,
        };
        self.buffer.check().await;

        // Phase 3: decide whether the session continues.
        let mut map = self.sessions.lock().await;
        let state = map
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        if state.is_exhausted() {
            let extra = self.compose_pool(&state.seen_ids, &state.seen_words, state.target)?;
            if !extra.is_empty() {
                state.absorb(extra);
            }
        }

        let mut session_complete = false;
        let mut generating = false;
        let mut summary = None;
        if state.is_exhausted() {
            if self.buffer.is_generating() {
                generating = true;
            } else {
                session_complete = true;
                summary = Some(Self::summary(state));
                self.store
                    .end_session(session_id, state.total, state.correct)?;
            }
        }

        let correct_display = served.correct_display_index;
        let correct_word = served
            .display_order
            .get(correct_display)
            .and_then(|&stored| served.question.choices.get(stored))
            .cloned()
            .unwrap_or_else(|| question.target_word.clone());

        let wire = AnswerWire {
            correct,
            correct_index: correct_display,
            correct_word,
            explanation: question.explanation.clone(),
            context_sentence: question.context_sentence.clone(),
            audio_hash,
            archive: ArchiveWire {
                archived: outcome.archived,
                reason: outcome.reason.clone(),
                question_id: question.id.clone(),
                interval_days: outcome.interval_days,
                archive_threshold: outcome.archive_threshold,
            },
            session_progress: SessionProgressWire {
                answered: state.total,
                correct: state.correct,
                remaining: state.remaining(),
            },
            session_complete,
            generating,
            summary,
        };

        if session_complete {
            map.remove(&session_id);
            tracing::info!(session_id, "Session complete");
        }
        Ok(wire)
    }

    /// Terminate early: persist totals and drop the in-memory state.
    pub async fn finish(&self, session_id: i64) -> Result<SummaryWire, SessionError> {
        let mut map = self.sessions.lock().await;
        let state = map
            .remove(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        self.store
            .end_session(session_id, state.total, state.correct)?;
        tracing::info!(session_id, "Session finished early");
        Ok(Self::summary(&state))
    }
}
