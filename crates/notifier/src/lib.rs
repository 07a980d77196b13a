//! Restock notification delivery.
//!
//! - [`LogNotifier`] — writes the notice to the log (default)
//! - [`EmailNotifier`] — sends the notice through the Resend HTTP API

pub mod email;
pub mod logger;

use std::sync::Arc;

use bwr_common::config::AppConfig;
use bwr_common::services::Notifier;

pub use email::EmailNotifier;
pub use logger::LogNotifier;

/// Pick the notifier the configuration enables: e-mail when both the
/// Resend key and sender are set, log-only otherwise.
pub fn from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    match (&config.resend_api_key, &config.email_from) {
        (Some(api_key), Some(from)) => {
            tracing::info!(from = %from, "E-mail restock notifications enabled");
            Arc::new(EmailNotifier::new(api_key.clone(), from.clone()))
        }
        _ => {
            tracing::info!("RESEND_API_KEY/EMAIL_FROM not set, restock notices are logged only");
            Arc::new(LogNotifier)
        }
    }
}
