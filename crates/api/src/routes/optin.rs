//! Waitlist opt-in route.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use bwr_common::error::AppError;
use bwr_engine::waitlist::{OptInParams, WaitlistService};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/opt-in", post(opt_in))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInResponse {
    pub ok: bool,
    pub waitlist_id: Uuid,
}

/// POST /api/opt-in — Join the waitlist for a product variant.
async fn opt_in(
    State(state): State<AppState>,
    Json(params): Json<OptInParams>,
) -> Result<Json<OptInResponse>, AppError> {
    let valid = params.validate().inspect_err(|_| {
        tracing::debug!(?params, "Opt-in rejected: missing fields");
    })?;

    let waitlist_id = WaitlistService::opt_in(&state.pool, &valid).await?;

    Ok(Json(OptInResponse {
        ok: true,
        waitlist_id,
    }))
}
