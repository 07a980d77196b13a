//! Payment routes — card setup for off-session charges, and the charge itself.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bwr_commerce::stripe::ChargeParams;
use bwr_common::error::AppError;
use bwr_engine::waitlist::WaitlistService;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/setup-intent", post(setup_intent))
        .route("/api/payments/charge", post(charge))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntentRequest {
    pub email: Option<String>,
    pub waitlist_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntentResponse {
    pub ok: bool,
    pub client_secret: Option<String>,
    pub publishable_key: Option<String>,
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub waitlist_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub ok: bool,
    pub payment_intent_id: String,
    pub status: String,
}

fn parse_waitlist_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid waitlistId '{}'", raw)))
}

/// POST /api/payments/setup-intent — Returns a client secret for saving a card.
async fn setup_intent(
    State(state): State<AppState>,
    Json(req): Json<SetupIntentRequest>,
) -> Result<Json<SetupIntentResponse>, AppError> {
    let email = req
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing email".to_string()))?;

    let waitlist_id = req
        .waitlist_id
        .as_deref()
        .filter(|w| !w.trim().is_empty())
        .map(parse_waitlist_id)
        .transpose()?;

    let customer = state.stripe.ensure_customer_by_email(&email).await?;

    let metadata_id = waitlist_id.map(|id| id.to_string()).unwrap_or_default();
    let intent = state
        .stripe
        .create_setup_intent(&customer.id, &metadata_id)
        .await?;

    if let Some(id) = waitlist_id {
        WaitlistService::attach_stripe_customer(&state.pool, id, &customer.id).await?;
    }

    tracing::info!(
        customer_id = %customer.id,
        setup_intent_id = %intent.id,
        waitlist_id = ?waitlist_id,
        "SetupIntent created"
    );

    Ok(Json(SetupIntentResponse {
        ok: true,
        client_secret: intent.client_secret,
        publishable_key: state.config.stripe_publishable_key.clone(),
        customer_id: customer.id,
    }))
}

/// POST /api/payments/charge — Charge the saved card of a waitlist entry off-session.
async fn charge(
    State(state): State<AppState>,
    Json(req): Json<ChargeRequest>,
) -> Result<Json<ChargeResponse>, AppError> {
    let (Some(raw_id), Some(amount)) = (req.waitlist_id, req.amount.filter(|a| *a > 0)) else {
        return Err(AppError::Validation("Missing fields".to_string()));
    };
    let waitlist_id = parse_waitlist_id(&raw_id)?;
    let currency = req.currency.unwrap_or_else(|| "usd".to_string());

    let entry = WaitlistService::get(&state.pool, waitlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Waitlist not found".to_string()))?;

    let customer_id = entry
        .stripe_customer_id
        .ok_or_else(|| AppError::Validation("Customer not on file".to_string()))?;

    let customer = state.stripe.retrieve_customer(&customer_id).await?;
    let payment_method = customer
        .default_payment_method()
        .ok_or_else(|| AppError::Validation("No default payment method on file".to_string()))?;

    let waitlist_id = waitlist_id.to_string();
    let intent = state
        .stripe
        .create_payment_intent(&ChargeParams {
            amount,
            currency: &currency,
            customer: &customer_id,
            payment_method,
            waitlist_id: &waitlist_id,
        })
        .await?;

    Ok(Json(ChargeResponse {
        ok: true,
        payment_intent_id: intent.id,
        status: intent.status,
    }))
}
