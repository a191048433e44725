//! Delivery snapshots and wire types for the session surface.
//!
//! The stored question row is authoritative; a served snapshot reorders
//! choices into a fresh display permutation and remembers it so the answer
//! maps back onto the stored row.

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::session::state::ServedQuestion;
use crate::store::operations::questions::{ChoiceDetail, Question, QuestionType};

/// Shuffle a question into display order.
pub fn serve(question: Question, is_new: bool) -> ServedQuestion {
    let mut display_order: Vec<usize> = (0..question.choices.len()).collect();
    display_order.shuffle(&mut rand::thread_rng());
    let correct_display_index = display_order
        .iter()
        .position(|&original| original == question.correct_index)
        .unwrap_or(question.correct_index);

    ServedQuestion {
        question,
        display_order,
        correct_display_index,
        is_new,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressWire {
    pub answered: u32,
    pub correct: u32,
    pub ready: usize,
    pub target: usize,
    pub generating: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWire {
    pub session_id: i64,
    pub question_type: QuestionType,
    pub stem: String,
    pub choices: Vec<String>,
    pub choice_details: Vec<ChoiceDetail>,
    pub correct_index: usize,
    pub correct_word: String,
    pub explanation: String,
    pub context_sentence: String,
    pub cluster_title: String,
    pub id: String,
    pub is_new: bool,
    pub progress: ProgressWire,
}

pub fn question_wire(
    served: &ServedQuestion,
    session_id: i64,
    progress: ProgressWire,
) -> QuestionWire {
    let q = &served.question;
    let choices: Vec<String> = served
        .display_order
        .iter()
        .map(|&i| q.choices[i].clone())
        .collect();
    let choice_details: Vec<ChoiceDetail> = if q.choice_details.len() == q.choices.len() {
        served
            .display_order
            .iter()
            .map(|&i| q.choice_details[i].clone())
            .collect()
    } else {
        q.choice_details.clone()
    };
    let correct_word = choices
        .get(served.correct_display_index)
        .cloned()
        .unwrap_or_else(|| q.target_word.clone());

    QuestionWire {
        session_id,
        question_type: q.question_type,
        stem: q.stem.clone(),
        choices,
        choice_details,
        correct_index: served.correct_display_index,
        correct_word,
        explanation: q.explanation.clone(),
        context_sentence: q.context_sentence.clone(),
        cluster_title: q.cluster_title.clone(),
        id: q.id.clone(),
        is_new: served.is_new,
        progress,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveWire {
    pub archived: bool,
    pub reason: String,
    pub question_id: String,
    pub interval_days: f64,
    pub archive_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionProgressWire {
    pub answered: u32,
    pub correct: u32,
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryWire {
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerWire {
    pub correct: bool,
    pub correct_index: usize,
    pub correct_word: String,
    pub explanation: String,
    pub context_sentence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_hash: Option<String>,
    pub archive: ArchiveWire,
    pub session_progress: SessionProgressWire,
    pub session_complete: bool,
    pub generating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryWire>,
}

/// Progress-stream payload; also returned by the resumption endpoint when
/// no question is outstanding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressSnapshot {
    pub session_id: i64,
    pub answered: u32,
    pub correct: u32,
    pub remaining: usize,
    pub ready: usize,
    pub target: usize,
    pub generating: bool,
    pub has_next: bool,
    pub session_complete: bool,
}
