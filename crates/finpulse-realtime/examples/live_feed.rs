//! Follow a live feed and print what the UI would show.
//!
//! ```sh
//! FINPULSE_WS_URL=wss://api.example.com/realtime FINPULSE_TOKEN=... \
//!     cargo run --example live_feed
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use finpulse_realtime::{
    CacheKey, RealtimeConfig, RealtimeResult, RealtimeSession, Selectors, SnapshotCache, UiEffect,
    init_tracing,
};
use tracing::info;

/// Stands in for the application's query cache.
struct LoggingCache;

#[async_trait]
impl SnapshotCache for LoggingCache {
    async fn invalidate(&self, keys: &[CacheKey]) -> RealtimeResult<()> {
        let keys: Vec<_> = keys.iter().map(CacheKey::as_str).collect();
        info!(?keys, "refetch");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("finpulse_realtime=debug,info");

    let url = std::env::var("FINPULSE_WS_URL")
        .unwrap_or_else(|_| "ws://127.0.0.1:8080/realtime".to_string());
    let token = std::env::var("FINPULSE_TOKEN").unwrap_or_default();

    let session =
        RealtimeSession::with_websocket(RealtimeConfig::default(), Arc::new(LoggingCache))?;
    let handle = session.handle();
    let mut effects = handle.subscribe_effects();
    session.connect(url, token)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            effect = effects.recv() => {
                let Ok(effect) = effect else { continue };
                match effect {
                    UiEffect::TransactionToast(tx) => {
                        info!(id = %tx.id, amount_cents = tx.amount_cents, "new transaction");
                    }
                    UiEffect::NotificationToast(n) => info!(title = %n.title, "notification"),
                    UiEffect::BudgetAlert(alert) => {
                        info!(category = %alert.category, kind = ?alert.alert_type, "budget alert");
                    }
                    UiEffect::Celebration { goal_name, celebration, .. } => {
                        info!(%goal_name, ?celebration, "celebrate");
                    }
                    UiEffect::GoalProgress(update) => {
                        let percent = update.percent();
                        info!(goal_id = %update.goal_id, percent, "goal progress");
                    }
                    UiEffect::AuthRequired { message } => {
                        info!(%message, "session expired, stopping");
                        break;
                    }
                }
                let stats = handle.stats();
                info!(
                    status = %handle.connection_status().status,
                    transactions = stats.transaction_count,
                    unread = handle.unread_notifications_count(),
                    "state"
                );
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
