//! Restock fan-out — turns one restock signal into delivery tasks.
//!
//! For a (merchant, product) pair:
//! 1. Read up to [`RESTOCK_BATCH_LIMIT`] queued waitlist entries, oldest first
//! 2. Build one task per entry (`autopurchase` or `notify` by preference)
//! 3. Append the tasks to the queue in read order
//!
//! Entries past the batch limit are left for a later restock signal; nothing
//! re-queues them. Entry status is not changed here.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use bwr_common::error::AppError;
use bwr_common::types::{DeliveryTask, TaskKind, WaitlistEntry};

use crate::queue::TaskQueue;

/// Maximum number of waitlist entries drained per restock signal.
pub const RESTOCK_BATCH_LIMIT: i64 = 100;

/// Read access to queued waitlist entries.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Queued entries for the pair, ordered by creation time ascending.
    async fn queued_entries(
        &self,
        merchant_id: Uuid,
        product_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WaitlistEntry>, AppError>;
}

/// PostgreSQL-backed waitlist reader.
#[derive(Clone)]
pub struct PgWaitlistStore {
    pool: PgPool,
}

impl PgWaitlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WaitlistStore for PgWaitlistStore {
    async fn queued_entries(
        &self,
        merchant_id: Uuid,
        product_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WaitlistEntry>, AppError> {
        let entries: Vec<WaitlistEntry> = sqlx::query_as(
            r#"
            SELECT w.id, w.merchant_id, w.product_id, w.email, w.wants_autopurchase,
                   w.status, w.stripe_customer_id, w.created_at,
                   m.shop_domain, p.shopify_variant_id
            FROM waitlist_entries w
            JOIN merchants m ON m.id = w.merchant_id
            JOIN products p ON p.id = w.product_id
            WHERE w.merchant_id = $1
              AND w.product_id = $2
              AND w.status = 'queued'
            ORDER BY w.created_at ASC, w.id ASC
            LIMIT $3
            "#,
        )
        .bind(merchant_id)
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Fans a restock signal out into the delivery queue.
#[derive(Clone)]
pub struct RestockFanout {
    store: Arc<dyn WaitlistStore>,
    queue: TaskQueue,
}

impl RestockFanout {
    pub fn new(store: Arc<dyn WaitlistStore>, queue: TaskQueue) -> Self {
        Self { store, queue }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Enqueue one delivery task per queued waitlist entry for the pair.
    ///
    /// Ids are trusted; the caller has already resolved them. Returns the
    /// number of tasks enqueued. A store failure propagates unchanged.
    pub async fn on_restock(&self, merchant_id: Uuid, product_id: Uuid) -> Result<usize, AppError> {
        let entries = self
            .store
            .queued_entries(merchant_id, product_id, RESTOCK_BATCH_LIMIT)
            .await?;

        let total = entries.len();
        let mut autopurchase = 0usize;

        for entry in entries {
            let task = DeliveryTask::for_entry(entry);
            if task.kind == TaskKind::Autopurchase {
                autopurchase += 1;
            }
            self.queue.enqueue(task).await?;
        }

        tracing::info!(
            merchant_id = %merchant_id,
            product_id = %product_id,
            tasks = total,
            autopurchase,
            notify = total - autopurchase,
            "Restock fanned out"
        );

        if total as i64 == RESTOCK_BATCH_LIMIT {
            tracing::warn!(
                merchant_id = %merchant_id,
                product_id = %product_id,
                limit = RESTOCK_BATCH_LIMIT,
                "Restock batch limit reached; later entries wait for the next signal"
            );
        }

        Ok(total)
    }
}
