//! HTTP API routes for the wellness service

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod facts;

use crate::facts::FactPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: FactPipeline,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate-facts", post(facts::generate_facts))
}

/// Health check endpoint
pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
        "status": "healthy",
        "service": "wellness",
        "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
