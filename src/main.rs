// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Elite API Server
//!
//! Serves profile matching, gated course chapters with quizzes, and the
//! referral points economy.

use elite_api::{config::Config, db::Db, services::CatalogSeed, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        pass_threshold = config.engine.pass_threshold,
        referral_threshold = config.engine.referral_threshold,
        referral_bypass_count = config.engine.referral_bypass_count,
        "Starting Elite API"
    );

    // Initialize the document store
    let db = if config.use_in_memory_store {
        tracing::warn!("Using in-memory store; data is lost on restart");
        Db::in_memory()
    } else {
        Db::connect_firestore(&config.gcp_project_id).await?
    };

    // Load the course catalog
    if let Some(path) = &config.catalog_seed_path {
        tracing::info!(path = %path, "Loading catalog");
        let catalog = CatalogSeed::load_from_file(path)?;
        let summary = catalog.seed(&db).await?;
        tracing::info!(
            profiles = summary.profiles,
            course_packs = summary.course_packs,
            chapters = summary.chapters,
            rewards = summary.rewards,
            "Catalog loaded"
        );
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db));

    // Build router
    let app = elite_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("elite_api=debug,info")),
        )
        .with(format)
        .init();
}
