//! Buffer, chat preemption, and manual generation over the HTTP surface.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_app, spawn_with_mock, TestApp};
use common::fixtures::{seed_cluster, seed_progress, stage2_response};
use common::http::{request, response_json, response_text};
use vocab_backend::providers::mock::MockGeneration;

/// A stage-1 reply that validates for any member of the seeded cluster:
/// every member is a choice and the context sentence names them all, so
/// the auto-repair finds whichever target the selector picked.
fn stage1_any_member() -> String {
    serde_json::json!({
        "stem": "Knowing the committee, she chose to ___ rather than demand.",
        "choices": ["cajole", "foil_one", "foil_two", "foil_three"],
        "correct_index": 0,
        "explanation": "The gentler word fits the scene.",
        "context_sentence": "Would she cajole, foil_one, foil_two, or foil_three the committee?"
    })
    .to_string()
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
async fn manual_generate_fills_the_bank() {
    let app = spawn_test_app().await;
    seed_cluster(
        app.state.store(),
        "Persuasion",
        &["cajole", "foil_one", "foil_two", "foil_three"],
    );
    app.mock.push_response(stage1_any_member());
    app.mock.push_response(stage2_response("cajole"));

    let resp = request(
        &app.app,
        Method::POST,
        "/api/generate",
        Some(json!({"count": 1})),
        &[],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK, "generate failed: {body}");
    assert_eq!(body["generated"], 1);
    assert_eq!(body["bank_size"], 1);

    wait_until_idle(&app).await;

    let ready = app.state.store().get_session_questions(10).unwrap();
    assert_eq!(ready.len(), 1);
    let q = &ready[0];
    // The correct choice always lines up with the selected target.
    assert!(q.choices[q.correct_index].eq_ignore_ascii_case(&q.target_word));
    assert_eq!(q.source, "mock");
    assert_eq!(q.choice_details.len(), 4);
}

#[tokio::test]
async fn session_start_triggers_background_fill() {
    let mock = Arc::new(MockGeneration::with_delay(Duration::from_millis(100)));
    let app = spawn_with_mock(mock, |cfg| {
        cfg.training.session_size = 1;
        cfg.training.min_ready_questions = 1;
    })
    .await;
    seed_cluster(
        app.state.store(),
        "Persuasion",
        &["cajole", "foil_one", "foil_two", "foil_three"],
    );
    // Due pair with no ready question: the most urgent build target.
    seed_progress(app.state.store(), "cajole", "Persuasion", 2.5, 1.0, 1, -1, true);
    app.mock.push_response(stage1_any_member());
    app.mock.push_response(stage2_response("cajole"));

    // No ready questions yet, but clusters exist: the session opens in
    // generating mode instead of failing.
    let resp = request(&app.app, Method::POST, "/api/session/start", None, &[]).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK, "start failed: {body}");
    assert_eq!(body["session_complete"], false);
    assert_eq!(body["generating"], true);
    let session_id = body["session_id"].as_i64().unwrap();

    wait_until_idle(&app).await;
    assert!(app.state.store().ready_question_count().unwrap() >= 1);

    // The generated question flows into the session on the next poll.
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
    assert_eq!(body["session_id"].as_i64().unwrap(), session_id);
    assert!(body.get("choices").is_some(), "expected a question: {body}");
}

#[tokio::test]
async fn chat_streams_tokens_and_preempts_builds() {
    // Slow generation keeps a build holding the generator when chat
    // arrives; the chat's own call pays the same delay, which stays well
    // inside the test budget.
    let mock = Arc::new(MockGeneration::with_delay(Duration::from_millis(1_500)));
    let app = spawn_with_mock(mock, |_| {}).await;
    seed_cluster(
        app.state.store(),
        "Persuasion",
        &["cajole", "foil_one", "foil_two", "foil_three"],
    );

    app.state.buffer().check().await;
    assert!(app.state.buffer().is_generating());
    assert_eq!(app.state.scheduler().live_build_count(), 1);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/chat",
        Some(json!({"prompt": "explain terse vs laconic"})),
        &[],
    )
    .await;
    // The tracked build was evicted before chat took the generator.
    assert_eq!(app.state.scheduler().live_build_count(), 0);
    let (status, body) = response_text(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: token"), "missing tokens: {body}");
    assert!(body.contains("event: done"), "missing done marker: {body}");

    // Nothing half-built was persisted by the cancelled task.
    assert_eq!(app.state.store().ready_question_count().unwrap(), 0);

    // Chat completion re-checks the buffer; with the pool still short a
    // new build spawns.
    let mut resumed = false;
    for _ in 0..200 {
        if app.state.buffer().is_generating() {
            resumed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(resumed, "buffer did not resume after chat");
    app.state.scheduler().shutdown().await;
    wait_until_idle(&app).await;
}

#[tokio::test]
async fn buffer_check_is_idempotent_under_hammering() {
    let mock = Arc::new(MockGeneration::with_delay(Duration::from_millis(300)));
    let app = spawn_with_mock(mock, |_| {}).await;
    seed_cluster(
        app.state.store(),
        "Persuasion",
        &["cajole", "foil_one", "foil_two", "foil_three"],
    );

    app.state.buffer().check().await;
    for _ in 0..8 {
        app.state.buffer().check().await;
    }
    assert_eq!(app.state.scheduler().live_build_count(), 1);

    app.state.scheduler().shutdown().await;
    wait_until_idle(&app).await;
}

#[tokio::test]
async fn empty_chat_prompt_is_rejected() {
    let app = spawn_test_app().await;
    let resp = request(
        &app.app,
        Method::POST,
        "/api/chat",
        Some(json!({"prompt": "  "})),
        &[],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_PROMPT");
}
