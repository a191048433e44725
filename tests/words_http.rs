//! Rotation management and stats endpoints.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::spawn_test_app;
use common::fixtures::{seed_progress, seed_question};
use common::http::{assert_json_error, request, response_json};

#[tokio::test]
async fn stats_reflect_store_contents() {
    let app = spawn_test_app().await;
    seed_question(app.state.store(), "q1", "terse", "Being Brief");
    seed_progress(app.state.store(), "terse", "Being Brief", 2.5, 1.0, 1, -1, true);
    seed_progress(app.state.store(), "curt", "Being Brief", 2.5, 1.0, 1, 3, false);

    let resp = request(&app.app, Method::GET, "/api/stats", None, &[]).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pairs_reviewed"], 2);
    assert_eq!(body["pairs_due"], 1);
    assert_eq!(body["pairs_active"], 2);
    assert_eq!(body["pairs_mastered"], 0);
    assert_eq!(body["questions_ready"], 1);
    assert_eq!(body["question_bank_size"], 1);
    assert_eq!(body["total_answers"], 2);
    assert_eq!(body["accuracy"], 50.0);
}

#[tokio::test]
async fn manual_archive_and_restore_round_trip() {
    let app = spawn_test_app().await;
    seed_question(app.state.store(), "q1", "terse", "Being Brief");
    seed_progress(app.state.store(), "terse", "Being Brief", 2.7, 14.0, 4, -1, true);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/words/archive",
        Some(json!({"word": "terse", "cluster_title": "Being Brief"})),
        &[],
    )
    .await;
    let (status, _, _) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);

    // The pair's questions drop out of the ready pool.
    assert_eq!(app.state.store().ready_question_count().unwrap(), 0);

    let resp = request(&app.app, Method::GET, "/api/words/archived", None, &[]).await;
    let (_, _, body) = response_json(resp).await;
    assert_eq!(body["pairs"].as_array().unwrap().len(), 1);
    assert_eq!(body["pairs"][0]["word"], "terse");

    let resp = request(
        &app.app,
        Method::POST,
        "/api/words/restore",
        Some(json!({"word": "terse", "cluster_title": "Being Brief"})),
        &[],
    )
    .await;
    let (status, _, _) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);

    // Restore preserves the SRS state and revives the questions.
    let progress = app
        .state
        .store()
        .get_word_progress("terse", "Being Brief")
        .unwrap()
        .unwrap();
    assert!(!progress.archived);
    assert_eq!(progress.interval_days, 14.0);
    assert_eq!(progress.repetitions, 4);
    assert_eq!(app.state.store().ready_question_count().unwrap(), 1);
}

#[tokio::test]
async fn archive_unknown_pair_is_not_found() {
    let app = spawn_test_app().await;
    let resp = request(
        &app.app,
        Method::POST,
        "/api/words/archive",
        Some(json!({"word": "ghost", "cluster_title": "Nowhere"})),
        &[],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn reset_due_makes_pair_due_tomorrow() {
    let app = spawn_test_app().await;
    seed_progress(app.state.store(), "terse", "Being Brief", 2.7, 30.0, 6, 25, true);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/words/reset-due",
        Some(json!({"word": "terse", "cluster_title": "Being Brief"})),
        &[],
    )
    .await;
    let (status, _, _) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);

    let progress = app
        .state
        .store()
        .get_word_progress("terse", "Being Brief")
        .unwrap()
        .unwrap();
    assert_eq!(progress.interval_days, 1.0);
    assert_eq!(progress.repetitions, 0);
    assert!(progress.next_review <= chrono::Utc::now() + chrono::Duration::days(1));
}

#[tokio::test]
async fn active_listing_is_soonest_due_first() {
    let app = spawn_test_app().await;
    seed_progress(app.state.store(), "terse", "Being Brief", 2.5, 1.0, 1, 5, true);
    seed_progress(app.state.store(), "curt", "Being Brief", 2.5, 1.0, 1, 1, true);

    let resp = request(&app.app, Method::GET, "/api/words/active", None, &[]).await;
    let (_, _, body) = response_json(resp).await;
    let pairs = body["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0]["word"], "curt");
    assert_eq!(pairs[1]["word"], "terse");
}
