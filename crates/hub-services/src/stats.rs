//! Traffic statistics — periodic sampling of the network byte counters.
//!
//! The sampler is a self-rescheduling task: sleep one interval, sample,
//! sleep again. Rates therefore assume the interval was honored exactly;
//! scheduling jitter and the time spent sampling add a small drift, which
//! is fine for an operational figure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A pair of byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetCounters {
    pub tx: u64,
    pub rx: u64,
}

/// Source of raw transmit/receive byte counts.
pub trait NetStatsCollector: Send + Sync {
    /// `(since last reset, since start)`.
    fn counters(&self) -> (NetCounters, NetCounters);

    /// Zero the since-last-reset counters.
    fn reset(&self);

    /// Read both counter pairs and zero the since-last-reset pair.
    ///
    /// The default reads then resets, so traffic recorded in between is
    /// dropped from the interval. Collectors that can swap atomically
    /// should override it.
    fn take_interval(&self) -> (NetCounters, NetCounters) {
        let counters = self.counters();
        self.reset();
        counters
    }
}

/// Atomic byte counters fed by the transport.
#[derive(Debug, Default)]
pub struct NetStats {
    interval_tx: AtomicU64,
    interval_rx: AtomicU64,
    total_tx: AtomicU64,
    total_rx: AtomicU64,
}

impl NetStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tx(&self, bytes: u64) {
        self.interval_tx.fetch_add(bytes, Ordering::Relaxed);
        self.total_tx.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_rx(&self, bytes: u64) {
        self.interval_rx.fetch_add(bytes, Ordering::Relaxed);
        self.total_rx.fetch_add(bytes, Ordering::Relaxed);
    }
}

impl NetStatsCollector for NetStats {
    fn counters(&self) -> (NetCounters, NetCounters) {
        let interval = NetCounters {
            tx: self.interval_tx.load(Ordering::Relaxed),
            rx: self.interval_rx.load(Ordering::Relaxed),
        };
        let total = NetCounters {
            tx: self.total_tx.load(Ordering::Relaxed),
            rx: self.total_rx.load(Ordering::Relaxed),
        };
        (interval, total)
    }

    fn reset(&self) {
        self.interval_tx.store(0, Ordering::Relaxed);
        self.interval_rx.store(0, Ordering::Relaxed);
    }

    fn take_interval(&self) -> (NetCounters, NetCounters) {
        let interval = NetCounters {
            tx: self.interval_tx.swap(0, Ordering::Relaxed),
            rx: self.interval_rx.swap(0, Ordering::Relaxed),
        };
        let total = NetCounters {
            tx: self.total_tx.load(Ordering::Relaxed),
            rx: self.total_rx.load(Ordering::Relaxed),
        };
        (interval, total)
    }
}

/// Hub-level traffic figures. Rates are bytes per second.
///
/// Each field is its own atomic so readers never wait on the sampler.
#[derive(Debug, Default)]
pub struct HubStatistics {
    net_tx_rate: AtomicU64,
    net_rx_rate: AtomicU64,
    net_tx_peak: AtomicU64,
    net_rx_peak: AtomicU64,
    net_tx_total: AtomicU64,
    net_rx_total: AtomicU64,
}

/// Point-in-time copy of `HubStatistics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub net_tx_rate: u64,
    pub net_rx_rate: u64,
    pub net_tx_peak: u64,
    pub net_rx_peak: u64,
    pub net_tx_total: u64,
    pub net_rx_total: u64,
}

impl HubStatistics {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            net_tx_rate: self.net_tx_rate.load(Ordering::Relaxed),
            net_rx_rate: self.net_rx_rate.load(Ordering::Relaxed),
            net_tx_peak: self.net_tx_peak.load(Ordering::Relaxed),
            net_rx_peak: self.net_rx_peak.load(Ordering::Relaxed),
            net_tx_total: self.net_tx_total.load(Ordering::Relaxed),
            net_rx_total: self.net_rx_total.load(Ordering::Relaxed),
        }
    }

    fn update(&self, interval_secs: u64, interval: NetCounters, total: NetCounters) {
        let tx_rate = interval.tx / interval_secs;
        let rx_rate = interval.rx / interval_secs;
        self.net_tx_rate.store(tx_rate, Ordering::Relaxed);
        self.net_rx_rate.store(rx_rate, Ordering::Relaxed);
        self.net_tx_peak.fetch_max(tx_rate, Ordering::Relaxed);
        self.net_rx_peak.fetch_max(rx_rate, Ordering::Relaxed);
        self.net_tx_total.store(total.tx, Ordering::Relaxed);
        self.net_rx_total.store(total.rx, Ordering::Relaxed);
    }
}

/// Samples a collector into `HubStatistics` on a fixed interval.
pub struct StatsAggregator {
    collector: Arc<dyn NetStatsCollector>,
    stats: Arc<HubStatistics>,
    interval: Duration,
    task: Option<(broadcast::Sender<()>, JoinHandle<()>)>,
}

impl StatsAggregator {
    /// Create an idle aggregator. `interval` is rounded down to whole seconds, minimum 1.
    pub fn new(collector: Arc<dyn NetStatsCollector>, interval: Duration) -> Self {
        Self {
            collector,
            stats: Arc::new(HubStatistics::default()),
            interval: Duration::from_secs(interval.as_secs().max(1)),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Shared handle to the figures, for readers outside the hub.
    pub fn statistics(&self) -> Arc<HubStatistics> {
        self.stats.clone()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_sampling(&self) -> bool {
        self.task.is_some()
    }

    /// Take one sample now and reset the collector's interval counters.
    pub fn sample(&self) {
        sample(self.collector.as_ref(), &self.stats, self.interval);
    }

    /// Start the sampling task. A second call while sampling is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let collector = self.collector.clone();
        let stats = self.stats.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(interval) => {
                        sample(collector.as_ref(), &stats, interval);
                    }
                }
            }
        });

        tracing::info!(interval_secs = interval.as_secs(), "statistics sampling started");
        self.task = Some((shutdown_tx, handle));
    }

    /// Stop sampling. Once this returns no further sample runs; the last
    /// figures stay readable.
    pub async fn shutdown(&mut self) {
        if let Some((shutdown_tx, handle)) = self.task.take() {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "statistics task ended abnormally");
            }
            tracing::info!("statistics sampling stopped");
        }
    }

    /// Emit the operational statistics line.
    pub fn log_line(&self, users: usize, peak_users: usize) {
        let s = self.stats.snapshot();
        tracing::info!(
            users,
            peak_users,
            net_tx_kbps = s.net_tx_rate / 1024,
            net_rx_kbps = s.net_rx_rate / 1024,
            peak_tx_kbps = s.net_tx_peak / 1024,
            peak_rx_kbps = s.net_rx_peak / 1024,
            "statistics"
        );
    }
}

fn sample(collector: &dyn NetStatsCollector, stats: &HubStatistics, interval: Duration) {
    let (since_reset, total) = collector.take_interval();
    stats.update(interval.as_secs().max(1), since_reset, total);
    tracing::trace!(tx = since_reset.tx, rx = since_reset.rx, "traffic sampled");
}
