//! hub-services — session registry, traffic statistics, broadcast dispatch,
//! and the lifecycle that ties them to a hub instance.

pub mod broadcast;
pub mod error;
pub mod hub;
pub mod registry;
pub mod stats;
pub mod user;

pub use broadcast::{BroadcastDispatcher, Router};
pub use error::HubError;
pub use hub::{Hub, HubSnapshot};
pub use registry::{RegistryTotals, SessionRegistry};
pub use stats::{HubStatistics, NetCounters, NetStats, NetStatsCollector, StatsAggregator, StatsSnapshot};
pub use user::{Credentials, Limits, QuitReason, User, UserState, FLAG_USER_LIST};
