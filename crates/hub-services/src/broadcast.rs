//! Hub-wide notifications — user list sync and quit announcements.
//!
//! Delivery itself belongs to a `Router`; this module only decides what is
//! sent to whom, in registry order.

use std::sync::Arc;

use bytes::Bytes;
use hub_core::message::{CMD_IQUI, QUI_FLAG_DISCONNECT};
use hub_core::AdcMessage;

use crate::error::HubError;
use crate::registry::SessionRegistry;
use crate::user::{User, FLAG_USER_LIST};

/// Per-message delivery primitives provided by the transport.
pub trait Router: Send + Sync {
    /// Queue `payload` for `target`. False means the target's queue refused it.
    fn route_to_user(&self, target: &User, payload: Bytes) -> bool;

    /// Queue `payload` for every user in `recipients`. Routers deliver
    /// only to sessions that are logged in.
    fn route_to_all(&self, recipients: &[Arc<User>], payload: Bytes);
}

/// Builds and sends hub-wide notifications.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    registry: SessionRegistry,
    router: Arc<dyn Router>,
}

impl BroadcastDispatcher {
    pub fn new(registry: SessionRegistry, router: Arc<dyn Router>) -> Self {
        Self { registry, router }
    }

    /// Send the identity of every logged-in user to `target`.
    ///
    /// Stops at the first refused delivery: a full queue will not drain
    /// during this call, so the rest would fail too. The registry stays
    /// locked for the whole pass so membership cannot shift under it.
    ///
    /// `FLAG_USER_LIST` is set on `target` for the duration and left set if
    /// its queue is still non-empty afterwards.
    pub async fn send_session_list(&self, target: &User) -> Result<usize, HubError> {
        target.set_flag(FLAG_USER_LIST);

        let result = {
            let inner = self.registry.lock().await;
            let mut delivered = 0usize;
            let mut failed = false;
            for user in inner.sessions.iter().filter(|u| u.is_logged_in()) {
                if !self.router.route_to_user(target, user.info().clone()) {
                    failed = true;
                    break;
                }
                delivered += 1;
            }
            if failed {
                tracing::debug!(sid = %target.sid(), delivered, "user list delivery stopped early");
                Err(HubError::DeliveryFailed { sid: target.sid() })
            } else {
                Ok(delivered)
            }
        };

        if target.send_queue_size() == 0 {
            target.unset_flag(FLAG_USER_LIST);
        }
        result
    }

    /// Announce that `leaving` is quitting to every other registered user.
    ///
    /// Call before the user is removed from the registry. `Hub::leave` does
    /// the announcement and the removal under one lock instead.
    pub async fn send_quit_notice(&self, leaving: &User) {
        let inner = self.registry.lock().await;
        self.broadcast_quit(&inner.sessions, leaving);
    }

    /// Quit broadcast over `sessions`, which the caller holds locked.
    pub(crate) fn broadcast_quit(&self, sessions: &[Arc<User>], leaving: &User) {
        let mut msg = AdcMessage::new(CMD_IQUI);
        msg.add_argument(&leaving.sid().to_string());
        if leaving.quit_reason().forces_disconnect() {
            msg.add_argument(QUI_FLAG_DISCONNECT);
        }

        let recipients: Vec<Arc<User>> = sessions
            .iter()
            .filter(|u| u.sid() != leaving.sid())
            .cloned()
            .collect();
        tracing::debug!(
            sid = %leaving.sid(),
            reason = ?leaving.quit_reason(),
            recipients = recipients.len(),
            "quit notice"
        );
        self.router.route_to_all(&recipients, msg.into_bytes());
    }
}
