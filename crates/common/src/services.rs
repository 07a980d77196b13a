//! Collaborator seams consumed by the delivery engine.
//!
//! Concrete implementations live in `bwr-notifier` (notifications) and
//! `bwr-commerce` (draft orders); the engine only sees these traits.

use async_trait::async_trait;

use crate::types::{DraftOrder, DraftOrderRequest, WaitlistEntry};

/// Tells a waiting shopper their product is back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_restock(&self, entry: &WaitlistEntry) -> anyhow::Result<()>;
}

/// Opens draft (invoice) orders on the commerce platform.
#[async_trait]
pub trait DraftOrders: Send + Sync {
    async fn create_draft_order(&self, request: &DraftOrderRequest) -> anyhow::Result<DraftOrder>;
}
