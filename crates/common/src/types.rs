use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WaitlistStatus {
    Queued,
    Delivered,
}

impl std::fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitlistStatus::Queued => write!(f, "queued"),
            WaitlistStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// A merchant store, keyed by its shop domain.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Merchant {
    pub id: Uuid,
    pub shop_domain: String,
    pub created_at: DateTime<Utc>,
}

/// A product variant shoppers can wait for.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub shopify_product_id: String,
    pub shopify_variant_id: String,
    pub created_at: DateTime<Utc>,
}

/// A shopper waiting for a product to come back in stock.
///
/// `shop_domain` and `shopify_variant_id` come from the merchant and
/// product rows; they are what the auto-purchase line item needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub product_id: Uuid,
    pub email: String,
    pub wants_autopurchase: bool,
    pub status: WaitlistStatus,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub shop_domain: String,
    pub shopify_variant_id: String,
}

/// What the drain loop should do for a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Notify,
    Autopurchase,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Notify => write!(f, "notify"),
            TaskKind::Autopurchase => write!(f, "autopurchase"),
        }
    }
}

/// A unit of restock delivery work. Consumed once, never persisted
/// beyond the queue's backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub kind: TaskKind,
    pub entry: WaitlistEntry,
}

impl DeliveryTask {
    /// Build the task matching the entry's stored preference.
    pub fn for_entry(entry: WaitlistEntry) -> Self {
        let kind = if entry.wants_autopurchase {
            TaskKind::Autopurchase
        } else {
            TaskKind::Notify
        };
        Self { kind, entry }
    }
}

/// A single draft order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub variant_id: String,
    pub quantity: u32,
}

/// Everything the commerce platform needs to open a draft order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrderRequest {
    /// Store the order is created in; `None` means the configured default store.
    pub shop_domain: Option<String>,
    pub line_items: Vec<LineItem>,
    pub customer_email: String,
    pub note: String,
}

/// A created draft order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub id: String,
    pub invoice_url: String,
}
