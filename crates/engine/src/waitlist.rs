//! Waitlist service — opt-in writes and lookups around waitlist entries.
//!
//! Opting in upserts the merchant (by shop domain) and the product (by
//! merchant + variant) and inserts a `queued` entry, all in one transaction.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use bwr_common::error::AppError;
use bwr_common::types::WaitlistEntry;

/// Service layer for waitlist persistence.
pub struct WaitlistService;

/// Opt-in request as posted by the storefront widget.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInParams {
    pub merchant_domain: Option<String>,
    pub shopify_product_id: Option<String>,
    pub shopify_variant_id: Option<String>,
    pub email: Option<String>,
    pub wants_autopurchase: Option<bool>,
}

/// An opt-in with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOptIn {
    pub merchant_domain: String,
    pub shopify_product_id: String,
    pub shopify_variant_id: String,
    pub email: String,
    pub wants_autopurchase: bool,
}

/// Merchant and product ids a storefront variant resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RestockTarget {
    pub merchant_id: Uuid,
    pub product_id: Uuid,
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl OptInParams {
    /// Check that domain, product, variant and email are all present and non-blank.
    pub fn validate(&self) -> Result<ValidOptIn, AppError> {
        match (
            required(&self.merchant_domain),
            required(&self.shopify_product_id),
            required(&self.shopify_variant_id),
            required(&self.email),
        ) {
            (Some(merchant_domain), Some(shopify_product_id), Some(shopify_variant_id), Some(email)) => {
                Ok(ValidOptIn {
                    merchant_domain,
                    shopify_product_id,
                    shopify_variant_id,
                    email,
                    wants_autopurchase: self.wants_autopurchase.unwrap_or(false),
                })
            }
            _ => Err(AppError::Validation("Missing required fields".to_string())),
        }
    }
}

impl WaitlistService {
    /// Record an opt-in and return the new waitlist entry id.
    pub async fn opt_in(pool: &PgPool, params: &ValidOptIn) -> Result<Uuid, AppError> {
        let mut tx = pool.begin().await?;

        let (merchant_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO merchants (shop_domain)
            VALUES ($1)
            ON CONFLICT (shop_domain) DO UPDATE SET shop_domain = EXCLUDED.shop_domain
            RETURNING id
            "#,
        )
        .bind(&params.merchant_domain)
        .fetch_one(&mut *tx)
        .await?;

        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (merchant_id, shopify_product_id, shopify_variant_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (merchant_id, shopify_variant_id)
                DO UPDATE SET shopify_product_id = EXCLUDED.shopify_product_id
            RETURNING id
            "#,
        )
        .bind(merchant_id)
        .bind(&params.shopify_product_id)
        .bind(&params.shopify_variant_id)
        .fetch_one(&mut *tx)
        .await?;

        let (waitlist_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO waitlist_entries (merchant_id, product_id, email, wants_autopurchase)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(merchant_id)
        .bind(product_id)
        .bind(&params.email)
        .bind(params.wants_autopurchase)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping `tx` on any `?` above rolls the whole opt-in back.
        tx.commit().await?;

        tracing::info!(
            waitlist_id = %waitlist_id,
            merchant_id = %merchant_id,
            product_id = %product_id,
            wants_autopurchase = params.wants_autopurchase,
            "Waitlist opt-in recorded"
        );

        Ok(waitlist_id)
    }

    /// Resolve a storefront (shop domain, variant) pair to internal ids.
    pub async fn resolve_variant(
        pool: &PgPool,
        shop_domain: &str,
        shopify_variant_id: &str,
    ) -> Result<Option<RestockTarget>, AppError> {
        let target: Option<RestockTarget> = sqlx::query_as(
            r#"
            SELECT m.id AS merchant_id, p.id AS product_id
            FROM products p
            JOIN merchants m ON p.merchant_id = m.id
            WHERE m.shop_domain = $1 AND p.shopify_variant_id = $2
            LIMIT 1
            "#,
        )
        .bind(shop_domain)
        .bind(shopify_variant_id)
        .fetch_optional(pool)
        .await?;

        Ok(target)
    }

    /// Get a single waitlist entry by id.
    pub async fn get(pool: &PgPool, waitlist_id: Uuid) -> Result<Option<WaitlistEntry>, AppError> {
        let entry: Option<WaitlistEntry> = sqlx::query_as(
            r#"
            SELECT w.id, w.merchant_id, w.product_id, w.email, w.wants_autopurchase,
                   w.status, w.stripe_customer_id, w.created_at,
                   m.shop_domain, p.shopify_variant_id
            FROM waitlist_entries w
            JOIN merchants m ON m.id = w.merchant_id
            JOIN products p ON p.id = w.product_id
            WHERE w.id = $1
            "#,
        )
        .bind(waitlist_id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Remember the payment-provider customer for an entry. Returns true if the entry exists.
    pub async fn attach_stripe_customer(
        pool: &PgPool,
        waitlist_id: Uuid,
        customer_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE waitlist_entries SET stripe_customer_id = $1 WHERE id = $2")
            .bind(customer_id)
            .bind(waitlist_id)
            .execute(pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            tracing::info!(waitlist_id = %waitlist_id, "Stripe customer attached to waitlist entry");
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> OptInParams {
        OptInParams {
            merchant_domain: Some("demo-shop.myshopify.com".to_string()),
            shopify_product_id: Some("gid://shopify/Product/123".to_string()),
            shopify_variant_id: Some("gid://shopify/ProductVariant/456".to_string()),
            email: Some("a@x.com".to_string()),
            wants_autopurchase: None,
        }
    }

    #[test]
    fn test_validate_defaults_autopurchase_to_false() {
        let valid = full().validate().unwrap();
        assert!(!valid.wants_autopurchase);
        assert_eq!(valid.email, "a@x.com");
    }

    #[test]
    fn test_validate_rejects_missing_or_blank_fields() {
        let mut missing_email = full();
        missing_email.email = None;
        assert!(matches!(
            missing_email.validate(),
            Err(AppError::Validation(_))
        ));

        let mut blank_variant = full();
        blank_variant.shopify_variant_id = Some("   ".to_string());
        assert!(blank_variant.validate().is_err());
    }

    #[test]
    fn test_params_deserialize_camel_case() {
        let params: OptInParams = serde_json::from_value(serde_json::json!({
            "merchantDomain": "demo-shop.myshopify.com",
            "shopifyProductId": "gid://shopify/Product/123",
            "shopifyVariantId": "gid://shopify/ProductVariant/456",
            "email": "b@x.com",
            "wantsAutopurchase": true
        }))
        .unwrap();

        let valid = params.validate().unwrap();
        assert!(valid.wants_autopurchase);
        assert_eq!(valid.shopify_variant_id, "gid://shopify/ProductVariant/456");
    }
}
