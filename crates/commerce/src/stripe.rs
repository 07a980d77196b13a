//! Minimal Stripe REST client: customers, SetupIntents, off-session
//! PaymentIntents and webhook event parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CommerceError;
use crate::signature::{STRIPE_TOLERANCE_SECS, verify_stripe_signature};

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub invoice_settings: Option<InvoiceSettings>,
}

impl Customer {
    /// The saved card to charge off-session, if any.
    pub fn default_payment_method(&self) -> Option<&str> {
        self.invoice_settings
            .as_ref()
            .and_then(|s| s.default_payment_method.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSettings {
    pub default_payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct CustomerList {
    data: Vec<Customer>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// Parameters for an off-session charge.
#[derive(Debug, Clone)]
pub struct ChargeParams<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub customer: &'a str,
    pub payment_method: &'a str,
    pub waitlist_id: &'a str,
}

/// Stripe API client. Built without a key it fails every call with
/// [`CommerceError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: Option<String>,
    api_url: String,
}

impl StripeClient {
    pub fn new(secret_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            api_url: STRIPE_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn key(&self) -> Result<&str, CommerceError> {
        self.secret_key
            .as_deref()
            .ok_or(CommerceError::NotConfigured("STRIPE_SECRET_KEY"))
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, CommerceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(text);

        Err(CommerceError::Api {
            provider: "stripe",
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CommerceError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(self.key()?)
            .query(query)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, CommerceError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(self.key()?)
            .form(form)
            .send()
            .await?;
        Self::read(response).await
    }

    /// Reuse the first customer with this email, or create one.
    pub async fn ensure_customer_by_email(&self, email: &str) -> Result<Customer, CommerceError> {
        let existing: CustomerList = self
            .get("/customers", &[("email", email), ("limit", "1")])
            .await?;
        if let Some(customer) = existing.data.into_iter().next() {
            return Ok(customer);
        }

        let customer: Customer = self
            .post("/customers", &[("email".to_string(), email.to_string())])
            .await?;
        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, CommerceError> {
        self.get(&format!("/customers/{}", customer_id), &[]).await
    }

    /// Form fields for an off-session card SetupIntent.
    pub fn setup_intent_form(customer_id: &str, waitlist_id: &str) -> Vec<(String, String)> {
        vec![
            ("customer".to_string(), customer_id.to_string()),
            ("payment_method_types[]".to_string(), "card".to_string()),
            ("usage".to_string(), "off_session".to_string()),
            ("metadata[waitlistId]".to_string(), waitlist_id.to_string()),
        ]
    }

    pub async fn create_setup_intent(
        &self,
        customer_id: &str,
        waitlist_id: &str,
    ) -> Result<SetupIntent, CommerceError> {
        self.post(
            "/setup_intents",
            &Self::setup_intent_form(customer_id, waitlist_id),
        )
        .await
    }

    /// Form fields for a confirmed off-session PaymentIntent.
    pub fn payment_intent_form(params: &ChargeParams<'_>) -> Vec<(String, String)> {
        vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.to_string()),
            ("customer".to_string(), params.customer.to_string()),
            ("payment_method".to_string(), params.payment_method.to_string()),
            ("confirm".to_string(), "true".to_string()),
            ("off_session".to_string(), "true".to_string()),
            (
                "metadata[waitlistId]".to_string(),
                params.waitlist_id.to_string(),
            ),
        ]
    }

    pub async fn create_payment_intent(
        &self,
        params: &ChargeParams<'_>,
    ) -> Result<PaymentIntent, CommerceError> {
        let intent: PaymentIntent = self
            .post("/payment_intents", &Self::payment_intent_form(params))
            .await?;
        tracing::info!(
            payment_intent_id = %intent.id,
            status = %intent.status,
            "Off-session charge submitted"
        );
        Ok(intent)
    }
}

/// Verify a webhook payload and parse it into an event.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<StripeEvent, CommerceError> {
    verify_stripe_signature(
        payload,
        signature_header,
        webhook_secret,
        chrono::Utc::now().timestamp(),
        STRIPE_TOLERANCE_SECS,
    )?;

    serde_json::from_slice(payload).map_err(|e| CommerceError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::stripe_signature;

    #[test]
    fn test_default_payment_method() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "cus_1",
            "email": "a@x.com",
            "invoice_settings": { "default_payment_method": "pm_123" }
        }))
        .unwrap();
        assert_eq!(customer.default_payment_method(), Some("pm_123"));

        let bare: Customer =
            serde_json::from_value(serde_json::json!({ "id": "cus_2", "email": null })).unwrap();
        assert_eq!(bare.default_payment_method(), None);
    }

    #[test]
    fn test_payment_intent_form_is_off_session() {
        let form = StripeClient::payment_intent_form(&ChargeParams {
            amount: 5000,
            currency: "usd",
            customer: "cus_1",
            payment_method: "pm_123",
            waitlist_id: "w-1",
        });
        assert!(form.contains(&("off_session".to_string(), "true".to_string())));
        assert!(form.contains(&("confirm".to_string(), "true".to_string())));
        assert!(form.contains(&("amount".to_string(), "5000".to_string())));
        assert!(form.contains(&("metadata[waitlistId]".to_string(), "w-1".to_string())));
    }

    #[test]
    fn test_setup_intent_form() {
        let form = StripeClient::setup_intent_form("cus_1", "");
        assert!(form.contains(&("usage".to_string(), "off_session".to_string())));
        assert!(form.contains(&("payment_method_types[]".to_string(), "card".to_string())));
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = StripeClient::new(None);
        assert!(!client.is_configured());
        let err = client.ensure_customer_by_email("a@x.com").await.unwrap_err();
        assert!(matches!(err, CommerceError::NotConfigured("STRIPE_SECRET_KEY")));
    }

    #[test]
    fn test_construct_event() {
        let payload = br#"{"id":"evt_1","type":"setup_intent.succeeded","data":{"object":{"customer":"cus_1"}}}"#;
        let now = chrono::Utc::now().timestamp();
        let sig = stripe_signature(payload, now, "whsec_x").unwrap();

        let event = construct_event(payload, &format!("t={},v1={}", now, sig), "whsec_x").unwrap();
        assert_eq!(event.event_type, "setup_intent.succeeded");
        assert_eq!(event.data.object["customer"], "cus_1");

        assert!(construct_event(payload, &format!("t={},v1={}", now, sig), "whsec_y").is_err());
    }
}
