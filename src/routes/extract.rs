// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON body extractor whose rejections use the API error shape.

use crate::error::AppError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

/// Drop-in for `axum::Json` on request bodies. A body that is not JSON, or
/// does not fit `T`, becomes a 400 validation error naming the field.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        let detail = text
            .split_once("target type: ")
            .map_or(text.as_str(), |(_, rest)| rest);
        tracing::debug!(detail, "Rejected JSON body");
        AppError::validation(rejected_field(detail), detail)
    }
}

/// Field named by a deserialization message, or `body` when none is named.
///
/// Messages look like `responses[0]: missing field `answer_id` at ...` or
/// `answers: invalid type: ...`; the path prefix is absent at the root.
fn rejected_field(detail: &str) -> String {
    let (path, message) = match detail.split_once(": ") {
        Some((path, rest)) if !path.is_empty() && !path.contains(' ') => (Some(path), rest),
        _ => (None, detail),
    };

    let missing = message
        .split_once("missing field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name);

    match (path, missing) {
        (Some(path), Some(name)) => format!("{}.{}", path, name),
        (None, Some(name)) => name.to_string(),
        (Some(path), None) => path.to_string(),
        (None, None) => "body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_field() {
        assert_eq!(
            rejected_field("missing field `profile_id` at line 1 column 2"),
            "profile_id"
        );
        assert_eq!(
            rejected_field("responses: invalid type: string \"oops\", expected a sequence at line 1 column 22"),
            "responses"
        );
        assert_eq!(
            rejected_field("responses[0]: missing field `answer_id` at line 1 column 40"),
            "responses[0].answer_id"
        );
        assert_eq!(
            rejected_field("Failed to parse the request body as JSON: EOF while parsing"),
            "body"
        );
        assert_eq!(
            rejected_field("Expected request with `Content-Type: application/json`"),
            "body"
        );
    }
}
