//! Wellness fact endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared_types::{ApiErrorBody, InnieRequest, WellnessFactResponse};
use tracing::{info, warn};

use crate::api::ApiState;
use crate::facts::FactsError;

impl IntoResponse for FactsError {
    fn into_response(self) -> Response {
        let status = match self {
            FactsError::EmptyTraits => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ApiErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// POST /generate-facts
///
/// Generation problems never fail the request; they degrade to fallback
/// facts. Only invalid input is rejected.
pub async fn generate_facts(
    State(state): State<ApiState>,
    Json(req): Json<InnieRequest>,
) -> Result<Json<WellnessFactResponse>, FactsError> {
    if let Some(selections) = &req.raw_selections {
        info!(answers = selections.len(), "fact request carries quiz selections");
    }

    let outcome = state.pipeline.run(&req.innie_traits).await.map_err(|e| {
        warn!(error = %e, "rejected fact request");
        e
    })?;

    if outcome.degraded {
        warn!(run_id = %outcome.run_id, "responding with fallback facts only");
    }

    Ok(Json(WellnessFactResponse {
        facts: outcome.into_texts(),
    }))
}
