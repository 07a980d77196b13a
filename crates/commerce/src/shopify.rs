//! Shopify Admin GraphQL client for draft (invoice) orders.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use bwr_common::services::DraftOrders;
use bwr_common::types::{DraftOrder, DraftOrderRequest, LineItem};

use crate::error::CommerceError;

const DRAFT_ORDER_CREATE: &str = r#"
mutation draftOrderCreate($input: DraftOrderInput!) {
  draftOrderCreate(input: $input) {
    draftOrder { id invoiceUrl }
    userErrors { field message }
  }
}
"#;

/// Shopify Admin API client.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    admin_token: Option<String>,
    api_version: String,
    default_shop: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<DraftOrderCreateData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderCreateData {
    draft_order_create: Option<DraftOrderCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderCreatePayload {
    draft_order: Option<DraftOrderNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderNode {
    id: String,
    invoice_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

/// Accept either a numeric variant id or a full GID.
pub fn variant_gid(variant_id: &str) -> String {
    if variant_id.starts_with("gid://") {
        variant_id.to_string()
    } else {
        format!("gid://shopify/ProductVariant/{}", variant_id)
    }
}

impl ShopifyClient {
    pub fn new(admin_token: Option<String>, api_version: String, default_shop: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            admin_token,
            api_version,
            default_shop,
        }
    }

    fn graphql_url(&self, shop: &str) -> String {
        format!("https://{}/admin/api/{}/graphql.json", shop, self.api_version)
    }

    /// GraphQL variables for `draftOrderCreate`.
    pub fn draft_order_variables(request: &DraftOrderRequest) -> Value {
        let line_items: Vec<Value> = request
            .line_items
            .iter()
            .map(|LineItem { variant_id, quantity }| {
                json!({ "variantId": variant_gid(variant_id), "quantity": quantity })
            })
            .collect();

        json!({
            "input": {
                "email": request.customer_email,
                "note": request.note,
                "lineItems": line_items,
            }
        })
    }

    fn parse_draft_order(body: GraphqlResponse) -> Result<DraftOrder, CommerceError> {
        if let Some(err) = body.errors.first() {
            return Err(CommerceError::Api {
                provider: "shopify",
                status: 200,
                message: err.message.clone(),
            });
        }

        let payload = body
            .data
            .and_then(|d| d.draft_order_create)
            .ok_or_else(|| CommerceError::Decode("missing draftOrderCreate payload".to_string()))?;

        if !payload.user_errors.is_empty() {
            let message = payload
                .user_errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CommerceError::Api {
                provider: "shopify",
                status: 200,
                message,
            });
        }

        let node = payload
            .draft_order
            .ok_or_else(|| CommerceError::Decode("draftOrder is null".to_string()))?;

        Ok(DraftOrder {
            id: node.id,
            invoice_url: node.invoice_url.unwrap_or_default(),
        })
    }

    /// Create a draft order and return its id and invoice URL.
    pub async fn create_draft_order(&self, request: &DraftOrderRequest) -> Result<DraftOrder, CommerceError> {
        let token = self
            .admin_token
            .as_deref()
            .ok_or(CommerceError::NotConfigured("SHOPIFY_ADMIN_TOKEN"))?;
        let shop = request
            .shop_domain
            .as_deref()
            .or(self.default_shop.as_deref())
            .ok_or(CommerceError::NotConfigured("SHOPIFY_SHOP_DOMAIN"))?;

        let response = self
            .client
            .post(self.graphql_url(shop))
            .header("X-Shopify-Access-Token", token)
            .json(&json!({
                "query": DRAFT_ORDER_CREATE,
                "variables": Self::draft_order_variables(request),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CommerceError::Api {
                provider: "shopify",
                status: status.as_u16(),
                message,
            });
        }

        let body: GraphqlResponse = response.json().await?;
        let draft = Self::parse_draft_order(body)?;

        tracing::debug!(shop = %shop, draft_order_id = %draft.id, "Shopify draft order created");
        Ok(draft)
    }
}

#[async_trait]
impl DraftOrders for ShopifyClient {
    async fn create_draft_order(&self, request: &DraftOrderRequest) -> anyhow::Result<DraftOrder> {
        Ok(ShopifyClient::create_draft_order(self, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DraftOrderRequest {
        DraftOrderRequest {
            shop_domain: Some("demo-shop.myshopify.com".to_string()),
            line_items: vec![LineItem {
                variant_id: "456".to_string(),
                quantity: 2,
            }],
            customer_email: "a@x.com".to_string(),
            note: "Restock quick checkout".to_string(),
        }
    }

    #[test]
    fn test_variant_gid() {
        assert_eq!(variant_gid("456"), "gid://shopify/ProductVariant/456");
        assert_eq!(
            variant_gid("gid://shopify/ProductVariant/456"),
            "gid://shopify/ProductVariant/456"
        );
    }

    #[test]
    fn test_draft_order_variables() {
        let vars = ShopifyClient::draft_order_variables(&request());
        assert_eq!(vars["input"]["email"], "a@x.com");
        assert_eq!(vars["input"]["note"], "Restock quick checkout");
        assert_eq!(
            vars["input"]["lineItems"][0]["variantId"],
            "gid://shopify/ProductVariant/456"
        );
        assert_eq!(vars["input"]["lineItems"][0]["quantity"], 2);
    }

    #[test]
    fn test_parse_draft_order_success() {
        let body: GraphqlResponse = serde_json::from_value(json!({
            "data": { "draftOrderCreate": {
                "draftOrder": { "id": "gid://shopify/DraftOrder/9", "invoiceUrl": "https://demo-shop.myshopify.com/i/9" },
                "userErrors": []
            }}
        }))
        .unwrap();

        let draft = ShopifyClient::parse_draft_order(body).unwrap();
        assert_eq!(draft.id, "gid://shopify/DraftOrder/9");
        assert_eq!(draft.invoice_url, "https://demo-shop.myshopify.com/i/9");
    }

    #[test]
    fn test_parse_draft_order_user_errors() {
        let body: GraphqlResponse = serde_json::from_value(json!({
            "data": { "draftOrderCreate": {
                "draftOrder": null,
                "userErrors": [{ "field": ["lineItems"], "message": "Variant is invalid" }]
            }}
        }))
        .unwrap();

        let err = ShopifyClient::parse_draft_order(body).unwrap_err();
        assert!(err.to_string().contains("Variant is invalid"));
    }

    #[tokio::test]
    async fn test_missing_token_is_config_error() {
        let client = ShopifyClient::new(None, "2024-07".to_string(), None);
        let err = client.create_draft_order(&request()).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotConfigured("SHOPIFY_ADMIN_TOKEN")));
    }
}
