/// Which backing store holds pending delivery tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// Process-local queue, lost on restart.
    Memory,
    /// Redis list, survives restarts.
    Redis,
}

impl std::str::FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(QueueBackend::Memory),
            "redis" => Ok(QueueBackend::Redis),
            other => Err(anyhow::anyhow!(
                "QUEUE_BACKEND must be 'memory' or 'redis', got '{}'",
                other
            )),
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// HTTP listen port (default: 4000)
    pub port: u16,

    /// Browser origins allowed by CORS
    pub allowed_origins: Vec<String>,

    /// Delivery task queue backend (default: memory)
    pub queue_backend: QueueBackend,

    /// Redis connection string, used by the redis queue backend
    pub redis_url: String,

    /// Redis list key holding pending delivery tasks
    pub queue_key: String,

    /// Drain loop period in milliseconds (default: 1000)
    pub queue_tick_ms: u64,

    /// Optional per-task handler timeout in seconds
    pub queue_handler_timeout_secs: Option<u64>,

    /// Stripe secret API key
    pub stripe_secret_key: Option<String>,

    /// Stripe publishable key, handed to the widget
    pub stripe_publishable_key: Option<String>,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<String>,

    /// Shopify Admin API access token
    pub shopify_admin_token: Option<String>,

    /// Shopify Admin API version (default: 2024-07)
    pub shopify_api_version: String,

    /// Store used for checkout links that name no merchant
    pub shopify_shop_domain: Option<String>,

    /// Shopify webhook HMAC secret
    pub shopify_webhook_secret: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,
}

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://127.0.0.1:8080,http://localhost:8080,https://bwr-starter.onrender.com";

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            queue_backend: std::env::var("QUEUE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_key: std::env::var("QUEUE_KEY")
                .unwrap_or_else(|_| "bwr:delivery_tasks".to_string()),
            queue_tick_ms: parse_tick_ms(
                &std::env::var("QUEUE_TICK_MS").unwrap_or_else(|_| "1000".to_string()),
            )?,
            queue_handler_timeout_secs: std::env::var("QUEUE_HANDLER_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("QUEUE_HANDLER_TIMEOUT_SECS must be a valid u64"))?,
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").ok(),
            stripe_publishable_key: std::env::var("STRIPE_PUBLISHABLE_KEY").ok(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
            shopify_admin_token: std::env::var("SHOPIFY_ADMIN_TOKEN").ok(),
            shopify_api_version: std::env::var("SHOPIFY_API_VERSION")
                .unwrap_or_else(|_| "2024-07".to_string()),
            shopify_shop_domain: std::env::var("SHOPIFY_SHOP_DOMAIN").ok(),
            shopify_webhook_secret: std::env::var("SHOPIFY_WEBHOOK_SECRET").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
        })
    }
}

/// Parse the drain loop period; zero would stall the consumer.
pub fn parse_tick_ms(raw: &str) -> anyhow::Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(anyhow::anyhow!("QUEUE_TICK_MS must be > 0")),
        Ok(ms) => Ok(ms),
        Err(_) => Err(anyhow::anyhow!("QUEUE_TICK_MS must be a valid u64")),
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}
