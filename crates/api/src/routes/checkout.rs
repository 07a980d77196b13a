//! Quick checkout links backed by draft orders.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use bwr_common::error::AppError;
use bwr_common::types::{DraftOrderRequest, LineItem};

use crate::state::AppState;

pub const CHECKOUT_NOTE: &str = "Restock quick checkout";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/checkout/link", post(checkout_link))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinkRequest {
    pub email: Option<String>,
    pub variant_id: Option<String>,
    pub quantity: Option<u32>,
    pub merchant_domain: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinkResponse {
    pub ok: bool,
    pub invoice_url: String,
}

impl CheckoutLinkRequest {
    fn into_draft_order(self, default_shop: Option<&str>) -> Result<DraftOrderRequest, AppError> {
        let (Some(email), Some(variant_id)) = (
            self.email.filter(|e| !e.trim().is_empty()),
            self.variant_id.filter(|v| !v.trim().is_empty()),
        ) else {
            return Err(AppError::Validation("Missing fields".to_string()));
        };

        Ok(DraftOrderRequest {
            shop_domain: self
                .merchant_domain
                .or_else(|| default_shop.map(str::to_string)),
            line_items: vec![LineItem {
                variant_id,
                quantity: self.quantity.filter(|q| *q > 0).unwrap_or(1),
            }],
            customer_email: email,
            note: CHECKOUT_NOTE.to_string(),
        })
    }
}

/// POST /api/checkout/link — Create a draft order and return its invoice URL.
async fn checkout_link(
    State(state): State<AppState>,
    Json(req): Json<CheckoutLinkRequest>,
) -> Result<Json<CheckoutLinkResponse>, AppError> {
    let request = req.into_draft_order(state.config.shopify_shop_domain.as_deref())?;

    let draft = state
        .draft_orders
        .create_draft_order(&request)
        .await
        .map_err(|e| AppError::Upstream(format!("{:#}", e)))?;

    tracing::info!(
        draft_order_id = %draft.id,
        email = %request.customer_email,
        "Checkout link created"
    );

    Ok(Json(CheckoutLinkResponse {
        ok: true,
        invoice_url: draft.invoice_url,
    }))
}
