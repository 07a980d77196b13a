//! Shared application state for the Axum API server.

use std::sync::Arc;

use bwr_commerce::StripeClient;
use bwr_common::config::AppConfig;
use bwr_common::services::DraftOrders;
use bwr_engine::restock::RestockFanout;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub fanout: RestockFanout,
    pub draft_orders: Arc<dyn DraftOrders>,
    pub stripe: StripeClient,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        fanout: RestockFanout,
        draft_orders: Arc<dyn DraftOrders>,
        stripe: StripeClient,
    ) -> Self {
        Self {
            pool,
            config,
            fanout,
            draft_orders,
            stripe,
        }
    }
}
