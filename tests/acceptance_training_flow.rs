//! Full loop: pre-generation fills the buffer, a session consumes it, the
//! SRS schedule moves, and the session survives the wait-for-generation
//! state before ending.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_with_mock, TestApp};
use common::fixtures::{seed_cluster, seed_progress};
use common::http::{request, response_json};
use vocab_backend::providers::mock::MockGeneration;

fn stage1_for_cajole() -> String {
    serde_json::json!({
        "stem": "Rather than argue, she decided to ___ the landlord over tea.",
        "choices": ["cajole", "beguile", "flatter", "wheedle"],
        "correct_index": 0,
        "explanation": "Cajoling is patient, good-humored coaxing.",
        "context_sentence": "Rather than argue, she decided to cajole the landlord over tea."
    })
    .to_string()
}

fn stage2_for_cajole() -> String {
    let details: Vec<serde_json::Value> = ["cajole", "beguile", "flatter", "wheedle"]
        .iter()
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

async fn wait_until_idle(app: &TestApp) {
    for _ in 0..600 {
        if !app.state.buffer().is_generating() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background build did not settle");
}

#[tokio::test]
async fn training_loop_generates_serves_and_extends() {
    let mock = Arc::new(MockGeneration::with_delay(Duration::from_millis(200)));
    let app = spawn_with_mock(mock, |cfg| {
        cfg.training.session_size = 1;
        cfg.training.min_ready_questions = 1;
    })
    .await;

    seed_cluster(
        app.state.store(),
        "Persuasion",
        &["cajole", "beguile", "flatter", "wheedle"],
    );
    // One active pair, overdue, with no banked question: the pre-generator
    // must cover it first.
    seed_progress(app.state.store(), "cajole", "Persuasion", 2.5, 1.0, 1, -1, true);
    app.mock.push_response(stage1_for_cajole());
    app.mock.push_response(stage2_for_cajole());

    // Pre-generation.
    app.state.buffer().check().await;
    wait_until_idle(&app).await;
    assert_eq!(app.state.store().ready_question_count().unwrap(), 1);

    // The session picks the banked question up through the review pool.
    let resp = request(&app.app, Method::POST, "/api/session/start", None, &[]).await;
    let (status, _, question) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK, "start failed: {question}");
    let session_id = question["session_id"].as_i64().unwrap();
    assert_eq!(question["cluster_title"], "Persuasion");
    assert_eq!(question["is_new"], false);
    assert_eq!(question["correct_word"], "cajole");

    let correct_index = question["correct_index"].as_u64().unwrap() as usize;
    let resp = request(
        &app.app,
        Method::POST,
        "/api/session/answer",
        Some(json!({
            "session_id": session_id,
            "selected_index": correct_index,
            "response_time_ms": 1_000,
        })),
        &[],
    )
    .await;
    let (status, _, result) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK, "answer failed: {result}");

    // Second successful review: the fixed six-day step, no archive yet.
    assert_eq!(result["correct"], true);
    assert_eq!(result["archive"]["archived"], false);
    let progress = app
        .state
        .store()
        .get_word_progress("cajole", "Persuasion")
        .unwrap()
        .unwrap();
    assert_eq!(progress.repetitions, 2);
    assert_eq!(progress.interval_days, 6.0);

    // The list is exhausted but the answer's own buffer check is still
    // running, so the session waits on generation instead of ending.
    assert_eq!(result["session_complete"], false);
    assert_eq!(result["generating"], true);

    // Generation dries up (no more scripted responses); the next poll
    // ends the session with a summary.
    wait_until_idle(&app).await;
    let resp = request(
        &app.app,
        Method::POST,
        "/api/session/next",
        Some(json!({"session_id": session_id})),
        &[],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_complete"], true);
    assert_eq!(body["summary"]["total"], 1);
    assert_eq!(body["summary"]["correct"], 1);

    // Lifetime stats aggregate the seeded review plus this one.
    let resp = request(&app.app, Method::GET, "/api/stats", None, &[]).await;
    let (_, _, stats) = response_json(resp).await;
    assert_eq!(stats["pairs_reviewed"], 1);
    assert_eq!(stats["total_answers"], 2);
    assert_eq!(stats["accuracy"], 100.0);
}
