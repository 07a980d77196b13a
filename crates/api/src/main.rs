//! BWR API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bwr_commerce::{ShopifyClient, StripeClient};
use bwr_common::config::{AppConfig, QueueBackend};
use bwr_common::db::{create_pool, run_migrations};
use bwr_common::redis_pool::create_redis_pool;
use bwr_common::services::DraftOrders;
use bwr_engine::handler::RestockTaskHandler;
use bwr_engine::queue::{RedisTaskStore, TaskQueue};
use bwr_engine::restock::{PgWaitlistStore, RestockFanout};

use bwr_api::routes::create_router;
use bwr_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("bwr_api=debug,bwr_engine=debug,bwr_notifier=info,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting BWR API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;

    // Delivery queue
    let queue = match config.queue_backend {
        QueueBackend::Memory => {
            tracing::warn!("Using in-memory delivery queue; pending tasks are lost on restart");
            TaskQueue::in_memory()
        }
        QueueBackend::Redis => {
            let redis = create_redis_pool(&config.redis_url).await?;
            TaskQueue::new(Arc::new(RedisTaskStore::new(redis, config.queue_key.clone())))
        }
    }
    .with_tick(Duration::from_millis(config.queue_tick_ms))
    .with_handler_timeout(config.queue_handler_timeout_secs.map(Duration::from_secs));

    // Collaborators
    let notifier = bwr_notifier::from_config(&config);
    let shopify: Arc<dyn DraftOrders> = Arc::new(ShopifyClient::new(
        config.shopify_admin_token.clone(),
        config.shopify_api_version.clone(),
        config.shopify_shop_domain.clone(),
    ));
    let stripe = StripeClient::new(config.stripe_secret_key.clone());
    if !stripe.is_configured() {
        tracing::warn!("STRIPE_SECRET_KEY not set; payment routes will fail");
    }

    // Start the single drain loop
    let handler = Arc::new(RestockTaskHandler::new(notifier, shopify.clone()));
    let drain = queue.drain(handler)?;

    let fanout = RestockFanout::new(Arc::new(PgWaitlistStore::new(pool.clone())), queue);
    let cors = cors_layer(&config.allowed_origins);
    let port = config.port;

    // Build application state
    let state = AppState::new(pool, config, fanout, shopify, stripe);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("BWR API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    drain.abort();
    tracing::info!("BWR API stopped.");
    Ok(())
}

/// CORS for the storefront widget. Requests without an `Origin` header are
/// not affected; unknown origins get no CORS headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
