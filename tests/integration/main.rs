//! Hub integration test harness.
//!
//! Tests run a full `Hub` in-process against a recording router that
//! stands in for the transport. Each test builds its own hub, so they can
//! run in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use hub_core::config::HubConfig;
use hub_core::Sid;
use hub_services::{Credentials, Hub, Limits, NetStats, Router, User, UserState};

mod concurrency;
mod lifecycle;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Per-recipient inboxes. A recipient whose inbox holds `capacity`
/// messages refuses further deliveries.
#[derive(Default)]
pub struct InboxRouter {
    pub capacity: Option<usize>,
    inboxes: Mutex<HashMap<Sid, Vec<Bytes>>>,
}

impl InboxRouter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Default::default()
        }
    }

    pub fn inbox(&self, sid: Sid) -> Vec<Bytes> {
        self.inboxes.lock().unwrap().get(&sid).cloned().unwrap_or_default()
    }

    fn push(&self, sid: Sid, payload: Bytes) -> bool {
        let mut inboxes = self.inboxes.lock().unwrap();
        let inbox = inboxes.entry(sid).or_default();
        if self.capacity.is_some_and(|cap| inbox.len() >= cap) {
            return false;
        }
        inbox.push(payload);
        true
    }
}

impl Router for InboxRouter {
    fn route_to_user(&self, target: &User, payload: Bytes) -> bool {
        self.push(target.sid(), payload)
    }

    fn route_to_all(&self, recipients: &[Arc<User>], payload: Bytes) {
        for user in recipients {
            if user.is_logged_in() {
                self.push(user.sid(), payload.clone());
            }
        }
    }
}

pub fn test_config() -> HubConfig {
    let mut config = HubConfig::default();
    config.hub.name = "integration".into();
    config.hub.max_users = 64;
    config.stats.interval_secs = 5;
    config
}

pub fn start_hub(router: Arc<dyn Router>) -> (Arc<NetStats>, Hub) {
    let net = Arc::new(NetStats::new());
    let hub = Hub::init(&test_config(), net.clone(), router).expect("hub init");
    (net, hub)
}

/// Allocate a SID, build a logged-in user, and join it.
pub async fn login(hub: &Hub, nick: &str, shared_size: u64) -> Arc<User> {
    let sid = hub.registry().allocate_sid().await.expect("sid");
    let user = Arc::new(User::new(
        sid,
        format!("CID{}", nick.to_uppercase()),
        nick,
        Bytes::from(format!("BINF {sid} NI{nick} SS{shared_size}\n")),
        Limits {
            shared_size,
            shared_files: shared_size / 1024,
        },
        Credentials::User,
    ));
    user.set_state(UserState::Normal);
    hub.join(user.clone()).await;
    user
}
