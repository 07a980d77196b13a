//! Inbound webhooks — commerce platform restock signals and payment events.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use bwr_commerce::stripe::construct_event;
use bwr_common::error::AppError;
use bwr_engine::waitlist::WaitlistService;

use crate::middleware::signature::ShopifyWebhook;
use crate::state::AppState;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/inventory", post(inventory_webhook))
        .route("/webhooks/stripe", post(stripe_webhook))
}

/// Restock signal for one storefront variant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPayload {
    pub merchant_domain: Option<String>,
    pub shopify_variant_id: String,
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub ok: bool,
    pub queued: usize,
}

/// POST /webhooks/inventory — Fan a restock out to the variant's waitlist.
///
/// Unknown (shop, variant) pairs are acknowledged without doing anything so
/// the platform does not retry them.
async fn inventory_webhook(
    State(state): State<AppState>,
    webhook: ShopifyWebhook,
) -> Result<Json<InventoryResponse>, AppError> {
    let payload: InventoryPayload = webhook.json()?;

    let shop_domain = payload
        .merchant_domain
        .or(webhook.shop_domain)
        .ok_or_else(|| AppError::Validation("Missing merchantDomain".to_string()))?;

    let Some(target) =
        WaitlistService::resolve_variant(&state.pool, &shop_domain, &payload.shopify_variant_id)
            .await?
    else {
        tracing::debug!(
            shop = %shop_domain,
            variant = %payload.shopify_variant_id,
            "Restock for unknown variant ignored"
        );
        return Ok(Json(InventoryResponse { ok: true, queued: 0 }));
    };

    let queued = state
        .fanout
        .on_restock(target.merchant_id, target.product_id)
        .await?;

    Ok(Json(InventoryResponse { ok: true, queued }))
}

/// POST /webhooks/stripe — Verify and log payment-provider events.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        tracing::error!("Missing STRIPE_WEBHOOK_SECRET");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server misconfigured".to_string(),
        ));
    };

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = construct_event(&body, signature, secret).map_err(|e| {
        tracing::warn!(error = %e, "Stripe signature verification failed");
        (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e))
    })?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe event");

    let object = &event.data.object;
    let object_id = object.get("id").and_then(|v| v.as_str()).unwrap_or_default();

    match event.event_type.as_str() {
        "setup_intent.succeeded" => {
            let customer = object
                .get("customer")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            tracing::info!(customer = %customer, setup_intent_id = %object_id, "SetupIntent succeeded");
        }
        "payment_intent.succeeded" => {
            tracing::info!(payment_intent_id = %object_id, "PaymentIntent succeeded");
        }
        "payment_intent.payment_failed" => {
            tracing::warn!(payment_intent_id = %object_id, "PaymentIntent failed");
        }
        other => {
            tracing::debug!(event_type = %other, "Unhandled Stripe event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}
