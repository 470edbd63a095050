// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile editing through PATCH /api/me.

use axum::http::{Method, StatusCode};
use elite_api::models::AcademicLevel;
use elite_api::services::Registration;
use serde_json::json;

mod common;
use common::{create_test_app, register_user, send, token_for};

#[tokio::test]
async fn test_update_profile_fields() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "mariama", None).await;
    let token = token_for(&state, &user.id);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/me",
        Some(&token),
        Some(json!({
            "first_name": " Mariama ",
            "city": "Saint-Louis",
            "phone": "+221 76 123 45 67",
            "academic_level": "LICENCE"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Mariama");
    assert_eq!(body["city"], "Saint-Louis");
    assert_eq!(body["academic_level"], "LICENCE");
    assert!(body.get("password_hash").is_none());

    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.phone, "+221 76 123 45 67");
    assert_eq!(stored.academic_level, Some(AcademicLevel::Licence));
    assert_eq!(stored.username, "mariama");
}

#[tokio::test]
async fn test_update_profile_ignores_referral_and_matching_fields() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "ousmane", None).await;
    let token = token_for(&state, &user.id);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/me",
        Some(&token),
        Some(json!({
            "last_name": "Ba",
            "referral_code": "FFFFFFFFFFFF",
            "referral_points": 999,
            "has_completed_matching": true,
            "selected_profile": "dev"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_name"], "Ba");

    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.referral_code, user.referral_code);
    assert_eq!(stored.referral_points, 0);
    assert!(!stored.has_completed_matching);
    assert!(stored.selected_profile.is_none());
}

#[tokio::test]
async fn test_update_profile_rejects_invalid_values() {
    let (app, state) = create_test_app().await;
    let user = register_user(&state, "aminata", None).await;
    let token = token_for(&state, &user.id);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/me",
        Some(&token),
        Some(json!({"phone": "12", "city": "Thiès"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["phone"].is_array());

    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.city, "");
    assert_eq!(stored.phone, "");

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/me",
        Some(&token),
        Some(json!({"academic_level": "DOCTORAT"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["academic_level"].is_array());
}

#[tokio::test]
async fn test_academic_level_set_after_signup_unlocks_path() {
    let (app, state) = create_test_app().await;
    let user = state
        .accounts
        .register(Registration {
            username: "cheikh".to_string(),
            email: "cheikh@example.com".to_string(),
            password: "correct horse battery".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let token = token_for(&state, &user.id);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/matching/select-profile",
        Some(&token),
        Some(json!({"profile_id": "dev"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/path", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["academic_level"].is_array());

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/me",
        Some(&token),
        Some(json!({"academic_level": "BAC"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, path) = send(&app, Method::GET, "/api/path", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(path["id"], "dev-bac");
}

#[tokio::test]
async fn test_update_profile_requires_auth() {
    let (app, _) = create_test_app().await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/me",
        None,
        Some(json!({"city": "Dakar"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
