//! Hub lifecycle — one registry, one sampler, one dispatcher per hub.
//!
//! Startup builds the registry before sampling begins; shutdown stops
//! sampling before evicting anyone, so a sample never sees a registry
//! being torn down.

use std::sync::Arc;

use hub_core::config::HubConfig;
use serde::Serialize;

use crate::broadcast::{BroadcastDispatcher, Router};
use crate::error::HubError;
use crate::registry::{RegistryTotals, SessionRegistry};
use crate::stats::{HubStatistics, NetStatsCollector, StatsAggregator, StatsSnapshot};
use crate::user::{Credentials, User, UserState};

/// Everything an operator or telemetry endpoint wants to see at once.
#[derive(Debug, Clone, Serialize)]
pub struct HubSnapshot {
    pub name: String,
    pub users: usize,
    pub peak_users: usize,
    pub shared_size: u64,
    pub shared_files: u64,
    #[serde(flatten)]
    pub net: StatsSnapshot,
}

pub struct Hub {
    name: String,
    registry: SessionRegistry,
    stats: StatsAggregator,
    dispatcher: BroadcastDispatcher,
}

impl Hub {
    /// Create the registry and start statistics sampling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(
        config: &HubConfig,
        collector: Arc<dyn NetStatsCollector>,
        router: Arc<dyn Router>,
    ) -> Result<Self, HubError> {
        let registry = SessionRegistry::init(config.hub.max_users, config.hub.first_sid)?;
        let mut stats = StatsAggregator::new(collector, config.stats.interval());
        stats.start();
        let dispatcher = BroadcastDispatcher::new(registry.clone(), router);

        tracing::info!(
            name = %config.hub.name,
            max_users = config.hub.max_users,
            "hub initialized"
        );
        Ok(Self {
            name: config.hub.name.clone(),
            registry,
            stats,
            dispatcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &BroadcastDispatcher {
        &self.dispatcher
    }

    pub fn statistics(&self) -> Arc<HubStatistics> {
        self.stats.statistics()
    }

    /// Register a user that has completed login.
    pub async fn join(&self, user: Arc<User>) {
        tracing::info!(sid = %user.sid(), nick = user.nick(), cid = user.cid(), "user joined");
        self.registry.add(user).await;
    }

    /// Take a user out of the hub, announcing the departure unless the
    /// session is already torn down. Returns whether it was registered.
    ///
    /// The announcement and the removal happen under one registry lock, so
    /// a concurrent user list sync sees the user either before its quit
    /// notice or not at all.
    pub async fn leave(&self, user: &Arc<User>) -> bool {
        let mut inner = self.registry.lock().await;
        if !inner.contains(user) {
            tracing::warn!(sid = %user.sid(), nick = user.nick(), "leave of unregistered user ignored");
            return false;
        }
        user.set_state(UserState::Cleanup);
        if user.credentials() != Credentials::None {
            self.dispatcher.broadcast_quit(&inner.sessions, user);
        }
        inner.remove(user);
        drop(inner);

        user.set_state(UserState::Disconnected);
        tracing::info!(
            sid = %user.sid(),
            nick = user.nick(),
            reason = ?user.quit_reason(),
            "user left"
        );
        true
    }

    pub async fn snapshot(&self) -> HubSnapshot {
        let RegistryTotals {
            count,
            count_peak,
            shared_size,
            shared_files,
        } = self.registry.totals().await;
        HubSnapshot {
            name: self.name.clone(),
            users: count,
            peak_users: count_peak,
            shared_size,
            shared_files,
            net: self.stats.snapshot(),
        }
    }

    /// Log the operational statistics line.
    pub async fn log_stats(&self) {
        let totals = self.registry.totals().await;
        self.stats.log_line(totals.count, totals.count_peak);
    }

    /// Stop sampling, then evict every remaining user through `destroy`
    /// without quit notices.
    pub async fn shutdown<F>(mut self, destroy: F)
    where
        F: FnMut(Arc<User>),
    {
        self.stats.shutdown().await;
        self.registry.shutdown(destroy).await;
        tracing::info!(name = %self.name, "hub stopped");
    }
}
