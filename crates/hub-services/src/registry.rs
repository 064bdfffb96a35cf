//! Session registry — the hub's list of live users.
//!
//! Membership is kept in join order and every lookup is a linear scan in
//! that order, so the earliest-joined match wins. The registry holds
//! references only; destroying a `User` is the caller's job except during
//! `shutdown`, where the registry drives it through the supplied closure.
//!
//! One mutex guards the list together with the aggregates derived from it
//! (peak count, shared size and file totals, SID counter).

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use hub_core::{Sid, SID_MAX};

use crate::error::HubError;
use crate::user::User;

pub(crate) struct RegistryInner {
    pub(crate) sessions: Vec<Arc<User>>,
    count_peak: usize,
    next_sid: u32,
    sid_max: u32,
    shared_size: u64,
    shared_files: u64,
}

/// Aggregate figures read under a single lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryTotals {
    pub count: usize,
    pub count_peak: usize,
    pub shared_size: u64,
    pub shared_files: u64,
}

/// The session registry — shared by handle between the hub's tasks.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    /// Create a registry with room for `capacity` sessions.
    ///
    /// `first_sid` outside `1..SID_MAX` falls back to 1.
    pub fn init(capacity: usize, first_sid: u32) -> Result<Self, HubError> {
        Self::with_sid_space(capacity, first_sid, SID_MAX)
    }

    fn with_sid_space(capacity: usize, first_sid: u32, sid_max: u32) -> Result<Self, HubError> {
        let mut sessions = Vec::new();
        sessions.try_reserve(capacity)?;
        let next_sid = if (1..sid_max).contains(&first_sid) { first_sid } else { 1 };
        Ok(Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                sessions,
                count_peak: 0,
                next_sid,
                sid_max,
                shared_size: 0,
                shared_files: 0,
            })),
        })
    }

    /// Register a joined user.
    pub async fn add(&self, user: Arc<User>) {
        let mut inner = self.inner.lock().await;
        let limits = user.limits();
        inner.shared_size += limits.shared_size;
        inner.shared_files += limits.shared_files;
        tracing::debug!(sid = %user.sid(), nick = user.nick(), "user added");
        inner.sessions.push(user);
        inner.count_peak = inner.count_peak.max(inner.sessions.len());
    }

    /// Unregister a user. Returns false, changing nothing, if it was not registered.
    pub async fn remove(&self, user: &Arc<User>) -> bool {
        let removed = self.inner.lock().await.remove(user);
        if !removed {
            tracing::warn!(sid = %user.sid(), nick = user.nick(), "remove of unregistered user ignored");
        }
        removed
    }

    pub async fn find_by_sid(&self, sid: Sid) -> Option<Arc<User>> {
        let inner = self.inner.lock().await;
        inner.sessions.iter().find(|u| u.sid() == sid).cloned()
    }

    pub async fn find_by_cid(&self, cid: &str) -> Option<Arc<User>> {
        let inner = self.inner.lock().await;
        inner.sessions.iter().find(|u| u.cid() == cid).cloned()
    }

    pub async fn find_by_nick(&self, nick: &str) -> Option<Arc<User>> {
        let inner = self.inner.lock().await;
        inner.sessions.iter().find(|u| u.nick() == nick).cloned()
    }

    /// Hand out the next SID not held by a live session.
    ///
    /// The counter only moves forward and wraps to 1 at the end of the SID
    /// space. SIDs allocated but not yet added are not tracked, so two
    /// allocations can only collide after a full wrap with no join between.
    pub async fn allocate_sid(&self) -> Result<Sid, HubError> {
        let mut inner = self.inner.lock().await;
        inner.allocate_sid()
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Highest count seen since start. Never decreases.
    pub async fn count_peak(&self) -> usize {
        self.inner.lock().await.count_peak
    }

    pub async fn shared_size(&self) -> u64 {
        self.inner.lock().await.shared_size
    }

    pub async fn shared_files(&self) -> u64 {
        self.inner.lock().await.shared_files
    }

    pub async fn totals(&self) -> RegistryTotals {
        let inner = self.inner.lock().await;
        RegistryTotals {
            count: inner.sessions.len(),
            count_peak: inner.count_peak,
            shared_size: inner.shared_size,
            shared_files: inner.shared_files,
        }
    }

    /// Users in join order, as of now.
    pub async fn sessions(&self) -> Vec<Arc<User>> {
        self.inner.lock().await.sessions.clone()
    }

    /// Hold the registry lock, e.g. for the length of a broadcast.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().await
    }

    /// Evict every remaining user without notifying peers.
    ///
    /// Each user's credentials are set to `None` before `destroy` runs so the
    /// destruction path does not announce the departure.
    pub async fn shutdown<F>(self, mut destroy: F)
    where
        F: FnMut(Arc<User>),
    {
        let mut inner = self.inner.lock().await;
        let remaining = inner.sessions.len();
        for user in inner.sessions.drain(..) {
            user.set_credentials(crate::user::Credentials::None);
            destroy(user);
        }
        inner.shared_size = 0;
        inner.shared_files = 0;
        tracing::info!(evicted = remaining, "session registry shut down");
    }
}

impl RegistryInner {
    pub(crate) fn contains(&self, user: &Arc<User>) -> bool {
        self.sessions.iter().any(|u| Arc::ptr_eq(u, user))
    }

    pub(crate) fn remove(&mut self, user: &Arc<User>) -> bool {
        let Some(pos) = self.sessions.iter().position(|u| Arc::ptr_eq(u, user)) else {
            return false;
        };
        self.sessions.remove(pos);
        let limits = user.limits();
        self.shared_size -= limits.shared_size;
        self.shared_files -= limits.shared_files;
        tracing::debug!(sid = %user.sid(), nick = user.nick(), "user removed");
        true
    }

    fn allocate_sid(&mut self) -> Result<Sid, HubError> {
        let live = self.sessions.len();
        if live >= (self.sid_max - 1) as usize {
            return Err(HubError::SidSpaceExhausted { live });
        }

        let candidate = self.next_sid;
        if !self.sessions.iter().any(|u| u.sid().get() == candidate) {
            self.advance_sid();
            return Ok(Sid(candidate));
        }

        let taken: HashSet<u32> = self.sessions.iter().map(|u| u.sid().get()).collect();
        for _ in 1..self.sid_max {
            let candidate = self.next_sid;
            self.advance_sid();
            if !taken.contains(&candidate) {
                return Ok(Sid(candidate));
            }
        }
        Err(HubError::SidSpaceExhausted { live })
    }

    fn advance_sid(&mut self) {
        self.next_sid += 1;
        if self.next_sid >= self.sid_max {
            self.next_sid = 1;
        }
    }
}
