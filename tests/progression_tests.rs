// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Purchase onboarding and chapter progression tests.

use axum::http::{Method, StatusCode};
use elite_api::db::{collections, pair_id, WriteBatch};
use elite_api::error::AppError;
use elite_api::models::ChapterStatus;
use serde_json::json;

mod common;
use common::{create_test_app, create_test_state, quiz_answers, register_user, send, token_for};
use common::{QUIZ_QUESTIONS, WEB_CHAPTERS};

async fn status_of(state: &elite_api::AppState, user_id: &str, chapter_id: &str) -> ChapterStatus {
    state
        .db
        .get_progress(user_id, chapter_id)
        .await
        .unwrap()
        .expect("progress row exists")
        .status
}

#[tokio::test]
async fn test_purchase_seeds_progress() {
    let state = create_test_state().await;
    let user = register_user(&state, "seed", None).await;

    let receipt = state
        .purchases
        .purchase_course_pack(&user.id, "web", "MOBILE_MONEY")
        .await
        .unwrap();

    assert_eq!(receipt.purchase_id, pair_id(&user.id, "web"));
    assert_eq!(receipt.chapters_unlocked, WEB_CHAPTERS.len());

    let purchase = state.db.get_purchase(&user.id, "web").await.unwrap().unwrap();
    assert_eq!(purchase.amount_paid, 15000);
    assert_eq!(purchase.payment_method, "MOBILE_MONEY");

    let rows = state.db.list_progress_for_pack(&user.id, "web").await.unwrap();
    assert_eq!(rows.len(), WEB_CHAPTERS.len());
    assert_eq!(status_of(&state, &user.id, "web-1").await, ChapterStatus::InProgress);
    assert_eq!(status_of(&state, &user.id, "web-2").await, ChapterStatus::Locked);
    assert_eq!(status_of(&state, &user.id, "web-3").await, ChapterStatus::Locked);
}

#[tokio::test]
async fn test_repeat_purchase_keeps_progress() {
    let state = create_test_state().await;
    let user = register_user(&state, "again", None).await;
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let mut batch = WriteBatch::new();
    batch
        .set(
            collections::CHAPTER_PROGRESS,
            pair_id(&user.id, "web-1"),
            &json!({
                "user_id": user.id,
                "chapter_id": "web-1",
                "pack_id": "web",
                "status": "COMPLETED",
                "last_accessed": "2026-01-01T00:00:00Z"
            }),
        )
        .unwrap();
    state.db.commit(batch).await.unwrap();

    let err = state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(status_of(&state, &user.id, "web-1").await, ChapterStatus::Completed);
    assert_eq!(state.db.list_purchases_for_user(&user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_commit_leaves_nothing_behind() {
    let state = create_test_state().await;
    let user = register_user(&state, "atomic", None).await;

    state.db.memory_store().unwrap().inject_commit_failure();
    let err = state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert!(state.db.get_purchase(&user.id, "web").await.unwrap().is_none());
    assert!(state
        .db
        .list_progress_for_pack(&user.id, "web")
        .await
        .unwrap()
        .is_empty());

    // Nothing was left half-done, so a retry succeeds.
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_row_is_repaired_once() {
    let state = create_test_state().await;
    let user = register_user(&state, "heal", None).await;
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let mut batch = WriteBatch::new();
    batch.delete(collections::CHAPTER_PROGRESS, pair_id(&user.id, "web-2"));
    state.db.commit(batch).await.unwrap();

    let first = state
        .progression
        .get_chapter_progress(&user.id, "web-2")
        .await
        .unwrap();
    let second = state
        .progression
        .get_chapter_progress(&user.id, "web-2")
        .await
        .unwrap();

    // web-1 is not completed yet, so web-2 comes back locked.
    assert_eq!(first.status, ChapterStatus::Locked);
    assert_eq!(second.status, ChapterStatus::Locked);
    assert_eq!(first.last_accessed, second.last_accessed);
    assert_eq!(
        state
            .db
            .list_progress_for_pack(&user.id, "web")
            .await
            .unwrap()
            .len(),
        WEB_CHAPTERS.len()
    );
}

#[tokio::test]
async fn test_concurrent_repairs_agree() {
    let state = create_test_state().await;
    let user = register_user(&state, "crowd", None).await;
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let mut batch = WriteBatch::new();
    for chapter_id in WEB_CHAPTERS {
        batch.delete(collections::CHAPTER_PROGRESS, pair_id(&user.id, chapter_id));
    }
    state.db.commit(batch).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let state = state.clone();
        let user_id = user.id.clone();
        let chapter_id = if n % 2 == 0 { "web-1" } else { "web-2" };
        handles.push(tokio::spawn(async move {
            state
                .progression
                .get_chapter_progress(&user_id, chapter_id)
                .await
                .unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    for chapter_id in ["web-1", "web-2"] {
        let stored = state
            .db
            .get_progress(&user.id, chapter_id)
            .await
            .unwrap()
            .unwrap();
        let seen: Vec<_> = results.iter().filter(|p| p.chapter_id == chapter_id).collect();
        assert_eq!(seen.len(), 4);
        for progress in seen {
            assert_eq!(progress.status, stored.status);
            assert_eq!(progress.last_accessed, stored.last_accessed);
        }
    }

    assert_eq!(status_of(&state, &user.id, "web-1").await, ChapterStatus::InProgress);
    assert_eq!(status_of(&state, &user.id, "web-2").await, ChapterStatus::Locked);
    let rows = state.db.list_progress_for_pack(&user.id, "web").await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_first_chapter_repairs_to_in_progress() {
    let state = create_test_state().await;
    let user = register_user(&state, "first", None).await;
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let mut batch = WriteBatch::new();
    for chapter_id in WEB_CHAPTERS {
        batch.delete(collections::CHAPTER_PROGRESS, pair_id(&user.id, chapter_id));
    }
    state.db.commit(batch).await.unwrap();

    let progress = state
        .progression
        .get_chapter_progress(&user.id, "web-1")
        .await
        .unwrap();
    assert_eq!(progress.status, ChapterStatus::InProgress);
}

#[tokio::test]
async fn test_passing_walks_the_pack() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "walker", None).await;
    let token = token_for(&state, &user.id);
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    for (index, chapter_id) in WEB_CHAPTERS.iter().enumerate() {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/chapters/{}/quiz/submit", chapter_id),
            Some(&token),
            Some(json!({"answers": quiz_answers(chapter_id, QUIZ_QUESTIONS)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], true);
        assert_eq!(status_of(&state, &user.id, chapter_id).await, ChapterStatus::Completed);

        match WEB_CHAPTERS.get(index + 1) {
            Some(next) => {
                assert_eq!(body["next_chapter_id"], *next);
                assert_eq!(body["track_finished"], false);
                assert_eq!(status_of(&state, &user.id, next).await, ChapterStatus::InProgress);
            }
            None => {
                assert_eq!(body["track_finished"], true);
                assert!(body.get("next_chapter_id").is_none());
                assert_eq!(body["message"], "Course completed! Visit your learning center.");
            }
        }
    }
}

#[tokio::test]
async fn test_completion_never_downgrades_next_chapter() {
    let state = create_test_state().await;
    let user = register_user(&state, "retake", None).await;
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let pass = quiz_answers("web-1", QUIZ_QUESTIONS);
    state.quizzes.submit_quiz(&user.id, "web-1", &pass).await.unwrap();
    state
        .quizzes
        .submit_quiz(&user.id, "web-2", &quiz_answers("web-2", QUIZ_QUESTIONS))
        .await
        .unwrap();

    // Passing web-1 again must leave the completed web-2 alone.
    state.quizzes.submit_quiz(&user.id, "web-1", &pass).await.unwrap();

    assert_eq!(status_of(&state, &user.id, "web-1").await, ChapterStatus::Completed);
    assert_eq!(status_of(&state, &user.id, "web-2").await, ChapterStatus::Completed);
    assert_eq!(status_of(&state, &user.id, "web-3").await, ChapterStatus::InProgress);
}

#[tokio::test]
async fn test_locked_chapter_quiz_is_forbidden() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "skipper", None).await;
    let token = token_for(&state, &user.id);
    state
        .purchases
        .purchase_course_pack(&user.id, "web", "CARD")
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chapters/web-3/quiz/submit",
        Some(&token),
        Some(json!({"answers": quiz_answers("web-3", QUIZ_QUESTIONS)})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");
    assert!(state
        .db
        .list_quiz_attempts(&user.id, "quiz-web-3")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_progress_route_and_owned_packs() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "reader", None).await;
    let token = token_for(&state, &user.id);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/courses/web/purchase",
        Some(&token),
        Some(json!({"payment_method": "MOBILE_MONEY"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, progress) = send(
        &app,
        Method::GET,
        "/api/chapters/web-1/progress",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["status"], "IN_PROGRESS");
    assert_eq!(progress["pack_id"], "web");

    let (status, mine) = send(&app, Method::GET, "/api/courses/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["web"]);

    let (status, all) = send(&app, Method::GET, "/api/courses", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
}
