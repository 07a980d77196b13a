use async_trait::async_trait;

use bwr_common::services::Notifier;
use bwr_common::types::WaitlistEntry;

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_restock(&self, entry: &WaitlistEntry) -> anyhow::Result<()> {
        tracing::info!(
            entry_id = %entry.id,
            email = %entry.email,
            variant = %entry.shopify_variant_id,
            "Notify"
        );
        Ok(())
    }
}
