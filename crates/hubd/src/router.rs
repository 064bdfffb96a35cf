//! Channel-backed message routing.
//!
//! Every connected user gets a bounded outbound queue. The connection task
//! owns the receiving end and writes to the socket; routing only ever
//! `try_send`s, so a full queue is reported as a failed delivery instead of
//! blocking the hub.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use hub_core::Sid;
use hub_services::{NetStats, Router, User};

pub struct ChannelRouter {
    queues: DashMap<Sid, mpsc::Sender<Bytes>>,
    net: Arc<NetStats>,
}

impl ChannelRouter {
    pub fn new(net: Arc<NetStats>) -> Self {
        Self {
            queues: DashMap::new(),
            net,
        }
    }

    /// Open the outbound queue for `sid`. The receiver goes to the writer task.
    #[allow(dead_code)]
    pub fn connect(&self, sid: Sid, depth: usize) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(depth.max(1));
        if self.queues.insert(sid, tx).is_some() {
            tracing::warn!(%sid, "replaced existing outbound queue");
        }
        rx
    }

    pub fn disconnect(&self, sid: Sid) {
        self.queues.remove(&sid);
    }

    /// Whether `sid` still has an outbound queue.
    #[allow(dead_code)]
    pub fn is_connected(&self, sid: Sid) -> bool {
        self.queues.contains_key(&sid)
    }

    fn deliver(&self, target: &User, payload: Bytes) -> bool {
        let Some(queue) = self.queues.get(&target.sid()) else {
            tracing::trace!(sid = %target.sid(), "no outbound queue");
            return false;
        };
        let len = payload.len() as u64;
        let ok = match queue.try_send(payload) {
            Ok(()) => {
                self.net.record_tx(len);
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(sid = %target.sid(), "outbound queue full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(sid = %target.sid(), "outbound queue closed");
                false
            }
        };
        // queued messages, not bytes
        target.set_send_queue_size(queue.max_capacity() - queue.capacity());
        ok
    }
}

impl Router for ChannelRouter {
    fn route_to_user(&self, target: &User, payload: Bytes) -> bool {
        self.deliver(target, payload)
    }

    fn route_to_all(&self, recipients: &[Arc<User>], payload: Bytes) {
        for user in recipients {
            if !user.is_logged_in() {
                continue;
            }
            if !self.deliver(user, payload.clone()) {
                tracing::trace!(sid = %user.sid(), "broadcast not delivered");
            }
        }
    }
}
