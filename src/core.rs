//! Startup wiring: store, integrations, poller, HTTP server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::integrations::Integrations;
use crate::poller::CompletionPoller;
use crate::server::{build_router, AppState};
use crate::state::MemoryStore;
use crate::traits::{BotApi, StateStore};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let integrations = Arc::new(Integrations::from_config(&config));

    // Re-adopt bots from a previous run. All other state starts empty.
    if let Some(recall_config) = &config.recall {
        for bot_id in &recall_config.seed_bot_ids {
            store.add_managed_bot(bot_id).await?;
        }
        if !recall_config.seed_bot_ids.is_empty() {
            info!(
                count = recall_config.seed_bot_ids.len(),
                "seeded managed bot ids from config"
            );
        }
    }

    let mut poller = None;
    let mut poller_stop = None;
    if let Some(recall) = integrations.recall.clone() {
        let bots: Arc<dyn BotApi> = recall;
        let p = Arc::new(CompletionPoller::new(
            store.clone(),
            bots,
            Duration::from_secs(config.poller.interval_secs),
            Duration::from_secs(config.poller.error_backoff_secs),
        ));
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        p.clone().spawn(stop_rx);
        poller = Some(p);
        poller_stop = Some(stop_tx);
    } else {
        warn!("Recall integration disabled, bot completion poller not started");
    }

    let state = AppState {
        store,
        integrations,
        poller,
        config: config.clone(),
        started_at: Instant::now(),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "recapd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(stop) = poller_stop {
        let _ = stop.send(()).await;
    }
    info!("recapd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
