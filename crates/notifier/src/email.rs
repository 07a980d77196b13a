//! Resend e-mail delivery.

use async_trait::async_trait;
use serde::Serialize;

use bwr_common::services::Notifier;
use bwr_common::types::WaitlistEntry;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Request body for `POST /emails`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResendEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

/// Sends restock notices through Resend.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
    api_url: String,
}

impl EmailNotifier {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
            api_url: RESEND_API_URL.to_string(),
        }
    }

    /// Point the notifier at a different endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Build the restock e-mail for an entry.
    pub fn compose(&self, entry: &WaitlistEntry) -> ResendEmail {
        ResendEmail {
            from: self.from.clone(),
            to: vec![entry.email.clone()],
            subject: "It's back in stock!".to_string(),
            text: format!(
                "Good news: the item you were waiting for at {} is available again.\n\n\
                 Head back to the store to grab it before it sells out.",
                entry.shop_domain
            ),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_restock(&self, entry: &WaitlistEntry) -> anyhow::Result<()> {
        let email = self.compose(entry);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Resend returned {}: {}", status, body);
        }

        tracing::debug!(entry_id = %entry.id, email = %entry.email, "Restock e-mail accepted");
        Ok(())
    }
}
