//! hubd — rendezvous hub daemon.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};

use hub_core::config::HubConfig;
use hub_services::{Hub, NetStats};

mod router;
mod status;

use router::ChannelRouter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = HubConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = HubConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        HubConfig::default()
    });
    tracing::info!(name = %config.hub.name, "hubd starting");

    // Shared state
    let net = Arc::new(NetStats::new());
    let router = Arc::new(ChannelRouter::new(net.clone()));
    let hub = Arc::new(
        Hub::init(&config, net.clone(), router.clone()).context("hub initialization failed")?,
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let stats_printer = {
        let hub = hub.clone();
        let period = config.stats.interval();
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = interval.tick() => hub.log_stats().await,
                }
            }
        })
    };

    let status_server = if config.status.enabled {
        let state = status::StatusState { hub: hub.clone() };
        let port = config.status.port;
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = status::serve(state, port, shutdown).await {
                tracing::error!(error = %e, "status server failed");
            }
        }))
    } else {
        None
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();
    let _ = shutdown_rx.recv().await;
    tracing::info!("shutting down");

    if let Err(e) = stats_printer.await {
        tracing::error!(error = %e, "stats printer exited abnormally");
    }
    if let Some(task) = status_server {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "status server exited abnormally");
        }
    }

    let hub = Arc::try_unwrap(hub)
        .map_err(|_| anyhow::anyhow!("hub still referenced at shutdown"))?;
    hub.log_stats().await;
    hub.shutdown(|user| {
        router.disconnect(user.sid());
        tracing::debug!(sid = %user.sid(), nick = user.nick(), "user destroyed");
    })
    .await;

    Ok(())
}
