use chrono::{Duration, Utc};

use vocab_backend::store::operations::clusters::{Cluster, ClusterEntry};
use vocab_backend::store::operations::questions::{ChoiceDetail, Question, QuestionType};
use vocab_backend::store::Store;

pub fn seed_cluster(store: &Store, title: &str, words: &[&str]) -> Cluster {
    let cluster = Cluster {
        title: title.to_string(),
        preamble: format!("Words about {title}."),
        commentary: String::new(),
        source_file: "distinctions.md".to_string(),
        entries: words
            .iter()
            .map(|w| ClusterEntry {
                word: w.to_string(),
                meaning: format!("meaning of {w}"),
                distinction: format!("distinction of {w}"),
            })
            .collect(),
    };
    store.import_clusters(&[cluster.clone()]).expect("seed cluster");
    cluster
}

/// A ready question with the target at stored index 0 and three cluster
/// siblings as distractors.
pub fn seed_question(store: &Store, id: &str, word: &str, cluster_title: &str) -> Question {
    let distractors = ["foil_one", "foil_two", "foil_three"];
    let question = Question {
        id: id.to_string(),
        question_type: QuestionType::FillBlank,
        target_word: word.to_string(),
        cluster_title: cluster_title.to_string(),
        stem: "Her reply was so ___ the room went quiet.".to_string(),
        choices: std::iter::once(word.to_string())
            .chain(distractors.iter().map(|d| d.to_string()))
            .collect(),
        correct_index: 0,
        explanation: format!("Only {word} carries the right nuance."),
        context_sentence: format!("Her reply was so {word} the room went quiet."),
        choice_details: std::iter::once(word)
            .chain(distractors.iter().copied())
            .map(|w| ChoiceDetail {
                word: w.to_string(),
                base_word: w.to_string(),
                meaning: format!("meaning of {w}"),
                distinction: format!("distinction of {w}"),
                why: String::new(),
            })
            .collect(),
        generated_at: Utc::now(),
        source: "mock".to_string(),
        answered_at: None,
        chosen_index: None,
        was_correct: None,
        response_time_ms: None,
        session_id: None,
    };
    store.save_question(&question).expect("seed question");
    question
}

/// Progress row due `due_offset_days` from now (negative = overdue).
#[allow(clippy::too_many_arguments)]
pub fn seed_progress(
    store: &Store,
    word: &str,
    cluster_title: &str,
    easiness_factor: f64,
    interval_days: f64,
    repetitions: u32,
    due_offset_days: i64,
    correct: bool,
) {
    store
        .upsert_word_progress(
            word,
            cluster_title,
            easiness_factor,
            interval_days,
            repetitions,
            Utc::now() + Duration::days(due_offset_days),
            correct,
        )
        .expect("seed progress");
}

pub fn stage2_response(word: &str) -> String {
    let details: Vec<serde_json::Value> = std::iter::once(word)
        .chain(["foil_one", "foil_two", "foil_three"])
        .map(|w| {
            serde_json::json!({
                "word": w,
                "base_word": w,
                "meaning": format!("meaning of {w}"),
                "distinction": format!("distinction of {w}"),
                "why": format!("why {w} fits or not")
            })
        })
        .collect();
    serde_json::json!({ "choice_details": details }).to_string()
}
