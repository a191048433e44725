//! In-memory state for live training sessions.
//!
//! The map is shared between the session manager (which owns each entry's
//! lifecycle) and the buffer controller (which only reads shortfall
//! numbers). Handlers for distinct sessions never alias the same entry;
//! one async lock around the map is all the coordination required.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::store::operations::questions::Question;

/// A question as delivered to the client: choices shuffled into a display
/// order, with the permutation retained so the answer maps back onto the
/// stored row.
#[derive(Debug, Clone)]
pub struct ServedQuestion {
    pub question: Question,
    /// `display_order[display_index] == stored_index`.
    pub display_order: Vec<usize>,
    pub correct_display_index: usize,
    /// True when the pair had no progress row at serve time.
    pub is_new: bool,
}

#[derive(Debug)]
pub struct SessionState {
    pub id: i64,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub total: u32,
    pub correct: u32,
    pub seen_ids: HashSet<String>,
    pub seen_words: HashSet<String>,
    /// Soft question-count goal for the session.
    pub target: usize,
    pub current: Option<ServedQuestion>,
}

impl SessionState {
    pub fn new(id: i64, questions: Vec<Question>, target: usize) -> Self {
        let seen_ids = questions.iter().map(|q| q.id.clone()).collect();
        let seen_words = questions
            .iter()
            .map(|q| q.target_word.to_lowercase())
            .collect();
        Self {
            id,
            questions,
            current_index: 0,
            total: 0,
            correct: 0,
            seen_ids,
            seen_words,
            target,
            current: None,
        }
    }

    /// Unanswered questions still queued in the stored list.
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current_index)
    }

    /// How far this session is from being filled to its target.
    pub fn shortfall(&self) -> usize {
        self.target.saturating_sub(self.remaining())
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    pub fn absorb(&mut self, extra: Vec<Question>) {
        for q in extra {
            self.seen_ids.insert(q.id.clone());
            self.seen_words.insert(q.target_word.to_lowercase());
            self.questions.push(q);
        }
    }
}

#[derive(Debug, Default)]
pub struct ActiveSessions {
    inner: Mutex<HashMap<i64, SessionState>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, HashMap<i64, SessionState>> {
        self.inner.lock().await
    }

    /// Sum of per-session shortfalls; part of the buffer target so
    /// half-filled sessions pull generation toward themselves.
    pub async fn total_shortfall(&self) -> usize {
        let map = self.inner.lock().await;
        map.values().map(|s| s.shortfall()).sum()
    }

    pub async fn live_count(&self) -> usize {
        self.inner.lock().await.len()
    }
}
