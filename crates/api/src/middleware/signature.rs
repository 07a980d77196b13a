//! Verified-webhook extractor for commerce platform callbacks.
//!
//! `ShopifyWebhook` buffers the raw body and checks it against the
//! `X-Shopify-Hmac-Sha256` header before any JSON parsing happens.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use bwr_commerce::signature::verify_shopify_hmac;
use bwr_common::error::AppError;

use crate::state::AppState;

pub const SHOPIFY_HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const SHOPIFY_SHOP_HEADER: &str = "x-shopify-shop-domain";

/// A webhook body whose HMAC has been verified.
#[derive(Debug, Clone)]
pub struct ShopifyWebhook {
    /// Value of `X-Shopify-Shop-Domain`, when sent.
    pub shop_domain: Option<String>,
    pub body: Bytes,
}

impl ShopifyWebhook {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))
    }
}

impl FromRequest<AppState> for ShopifyWebhook {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = state
            .config
            .shopify_webhook_secret
            .clone()
            .ok_or_else(|| AppError::Config("SHOPIFY_WEBHOOK_SECRET is not configured".to_string()))?;

        let (hmac, shop_domain) = {
            let header = |name: &str| {
                req.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string())
            };
            (header(SHOPIFY_HMAC_HEADER), header(SHOPIFY_SHOP_HEADER))
        };

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(format!("Unreadable webhook body: {}", e)))?;

        let verified = hmac
            .as_deref()
            .map(|h| verify_shopify_hmac(&body, h, &secret).is_ok())
            .unwrap_or(false);

        if !verified {
            tracing::warn!(shop = ?shop_domain, "Rejected webhook with invalid signature");
            return Err(AppError::Signature("Invalid signature".to_string()));
        }

        Ok(Self { shop_domain, body })
    }
}
