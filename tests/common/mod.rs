// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use elite_api::config::Config;
use elite_api::db::Db;
use elite_api::middleware::auth::create_jwt;
use elite_api::models::{AcademicLevel, User};
use elite_api::routes::create_router;
use elite_api::services::{CatalogSeed, Registration};
use elite_api::AppState;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Chapters of the "web" pack, in order.
#[allow(dead_code)]
pub const WEB_CHAPTERS: [&str; 3] = ["web-1", "web-2", "web-3"];

/// Chapters of the "data" pack, in order.
#[allow(dead_code)]
pub const DATA_CHAPTERS: [&str; 2] = ["data-1", "data-2"];

/// Questions per chapter quiz; each is worth one point.
#[allow(dead_code)]
pub const QUIZ_QUESTIONS: usize = 5;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection to the emulator.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::connect_firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

fn quiz(chapter_id: &str) -> Value {
    let questions: Vec<Value> = (1..=QUIZ_QUESTIONS)
        .map(|n| {
            let id = format!("{}-q{}", chapter_id, n);
            json!({
                "id": id,
                "text": format!("Question {}", n),
                "order": n,
                "points": 1,
                "choices": [
                    {"id": format!("{}-ok", id), "text": "right", "is_correct": true},
                    {"id": format!("{}-ko", id), "text": "wrong", "is_correct": false}
                ]
            })
        })
        .collect();

    json!({"id": format!("quiz-{}", chapter_id), "questions": questions})
}

fn chapters(ids: &[&str]) -> Vec<Value> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            json!({
                "id": id,
                "title": format!("Chapter {}", index + 1),
                "order": index + 1,
                "quiz": quiz(id)
            })
        })
        .collect()
}

/// Catalog shared by the integration tests.
#[allow(dead_code)]
pub fn test_catalog() -> CatalogSeed {
    let catalog = json!({
        "profiles": [
            {"id": "data", "name": "Data Analyst", "category": "tech"},
            {"id": "design", "name": "Designer", "category": "creative"},
            {"id": "dev", "name": "Developer", "category": "tech"},
            {"id": "marketing", "name": "Marketer", "category": "business"}
        ],
        "matching_questions": [
            {
                "id": "mq1", "text": "What do you enjoy?", "order": 1,
                "answers": [
                    {"id": "mq1-build", "text": "Building", "profile_weights": {"dev": 3, "data": 1}},
                    {"id": "mq1-draw", "text": "Drawing", "profile_weights": {"design": 3}},
                    {"id": "mq1-sell", "text": "Selling", "profile_weights": "{\"marketing\": 2, \"design\": \"1\"}"}
                ]
            },
            {
                "id": "mq2", "text": "Pick a tool", "order": 2,
                "answers": [
                    {"id": "mq2-sql", "text": "SQL", "profile_weights": {"data": 4, "dev": "oops"}},
                    {"id": "mq2-figma", "text": "Figma", "profile_weights": {"design": 2}},
                    {"id": "mq2-none", "text": "Nothing", "profile_weights": {}}
                ]
            }
        ],
        "course_packs": [
            {"id": "web", "title": "Web Development", "domain": "tech", "price": 15000,
             "profile_id": "dev", "chapters": chapters(&WEB_CHAPTERS)},
            {"id": "data", "title": "Data Basics", "domain": "tech", "price": 12000,
             "profile_id": "data", "chapters": chapters(&DATA_CHAPTERS)}
        ],
        "rewards": [
            {"id": "free-data", "name": "Free Data pack", "points_required": 3,
             "kind": {"type": "COURSE_PACK", "pack_id": "data"}},
            {"id": "scholarship", "name": "Scholarship", "points_required": 2,
             "kind": {"type": "SCHOLARSHIP", "amount": 50000}},
            {"id": "big", "name": "Big scholarship", "points_required": 5,
             "kind": {"type": "SCHOLARSHIP", "amount": 200000}}
        ],
        "adaptive_paths": [
            {"id": "dev-bac", "profile_id": "dev", "academic_level": "BAC",
             "steps": ["HTML", "JavaScript", "Rust"], "duration_months": 9}
        ]
    });

    CatalogSeed::load_from_json(&catalog.to_string()).expect("test catalog is valid")
}

/// Create a test app over a seeded in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = create_test_state().await;
    (create_router(state.clone()), state)
}

/// Shared state over a seeded in-memory store.
#[allow(dead_code)]
pub async fn create_test_state() -> Arc<AppState> {
    let db = Db::in_memory();
    test_catalog()
        .seed(&db)
        .await
        .expect("Failed to seed test catalog");
    Arc::new(AppState::new(Config::test_default(), db))
}

/// Register a user, optionally with a referral code.
#[allow(dead_code)]
pub async fn register_user(state: &AppState, username: &str, referral_code: Option<&str>) -> User {
    state
        .accounts
        .register(Registration {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "correct horse battery".to_string(),
            academic_level: Some(AcademicLevel::Bac),
            referral_code: referral_code.map(str::to_string),
            ..Default::default()
        })
        .await
        .expect("Failed to register test user")
}

/// Register `count` users with `referrer`'s code.
#[allow(dead_code)]
pub async fn add_referrals(state: &AppState, referrer: &User, count: usize) {
    for n in 0..count {
        register_user(
            state,
            &format!("{}-ref{}", referrer.username, n),
            Some(&referrer.referral_code),
        )
        .await;
    }
}

/// Overwrite a user's point balance.
#[allow(dead_code)]
pub async fn set_points(state: &AppState, user_id: &str, points: i64) {
    let mut user = state.db.get_user(user_id).await.unwrap().unwrap();
    user.referral_points = points;
    state
        .db
        .set(elite_api::db::collections::USERS, user_id, &user)
        .await
        .unwrap();
}

/// Quiz answers for a chapter with the first `correct` questions right and
/// the rest wrong.
#[allow(dead_code)]
pub fn quiz_answers(chapter_id: &str, correct: usize) -> BTreeMap<String, Value> {
    (1..=QUIZ_QUESTIONS)
        .map(|n| {
            let question_id = format!("{}-q{}", chapter_id, n);
            let suffix = if n <= correct { "ok" } else { "ko" };
            let choice_id = format!("{}-{}", question_id, suffix);
            (question_id, Value::String(choice_id))
        })
        .collect()
}

#[allow(dead_code)]
pub fn token_for(state: &AppState, user_id: &str) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key).unwrap()
}

/// Send a request and return the status and JSON body (Null when empty).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
