//! Delivery task handler — dispatches a drained task to its collaborator.
//!
//! - `notify` → [`Notifier`] keyed on the entry's email
//! - `autopurchase` → [`DraftOrders`] with a single-unit line item

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use bwr_common::services::{DraftOrders, Notifier};
use bwr_common::types::{DeliveryTask, DraftOrderRequest, LineItem, TaskKind};

/// Note attached to draft orders opened on restock.
pub const AUTOPURCHASE_NOTE: &str = "Auto-purchase on restock";

/// Why a delivery task could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Notification to {email} failed: {reason}")]
    Notify { email: String, reason: String },

    #[error("Draft order for {email} failed: {reason}")]
    DraftOrder { email: String, reason: String },

    #[error("Handler timed out after {0:?}")]
    TimedOut(Duration),
}

/// Consumes one delivery task.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &DeliveryTask) -> Result<(), HandlerError>;
}

/// Production handler wiring tasks to the notification and draft-order collaborators.
pub struct RestockTaskHandler {
    notifier: Arc<dyn Notifier>,
    draft_orders: Arc<dyn DraftOrders>,
}

impl RestockTaskHandler {
    pub fn new(notifier: Arc<dyn Notifier>, draft_orders: Arc<dyn DraftOrders>) -> Self {
        Self {
            notifier,
            draft_orders,
        }
    }

    /// Draft order request for an auto-purchase task.
    pub fn draft_order_request(task: &DeliveryTask) -> DraftOrderRequest {
        DraftOrderRequest {
            shop_domain: Some(task.entry.shop_domain.clone()),
            line_items: vec![LineItem {
                variant_id: task.entry.shopify_variant_id.clone(),
                quantity: 1,
            }],
            customer_email: task.entry.email.clone(),
            note: AUTOPURCHASE_NOTE.to_string(),
        }
    }
}

#[async_trait]
impl TaskHandler for RestockTaskHandler {
    async fn handle(&self, task: &DeliveryTask) -> Result<(), HandlerError> {
        let entry = &task.entry;

        match task.kind {
            TaskKind::Notify => {
                self.notifier
                    .notify_restock(entry)
                    .await
                    .map_err(|e| HandlerError::Notify {
                        email: entry.email.clone(),
                        reason: format!("{:#}", e),
                    })?;

                tracing::info!(entry_id = %entry.id, email = %entry.email, "Restock notice sent");
            }
            TaskKind::Autopurchase => {
                let request = Self::draft_order_request(task);
                let draft = self
                    .draft_orders
                    .create_draft_order(&request)
                    .await
                    .map_err(|e| HandlerError::DraftOrder {
                        email: entry.email.clone(),
                        reason: format!("{:#}", e),
                    })?;

                tracing::info!(
                    entry_id = %entry.id,
                    email = %entry.email,
                    draft_order_id = %draft.id,
                    invoice_url = %draft.invoice_url,
                    "Draft order created"
                );
            }
        }

        Ok(())
    }
}
