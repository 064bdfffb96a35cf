//! Connected user — the per-session state the registry reads and writes.
//!
//! Identity fields are fixed once the session has been assigned a SID.
//! Everything the hub changes during the session's life (credentials,
//! protocol state, quit reason, flags, queue size) lives in atomics so a
//! `User` can be shared as `Arc<User>` between the registry, the router,
//! and the connection task without a lock.

use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

use bytes::Bytes;
use hub_core::Sid;
use serde::Serialize;

/// Set while the user list is being pushed to this user.
pub const FLAG_USER_LIST: u32 = 0x01;

/// Trust level. `None` marks a session whose teardown has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Credentials {
    None = 0,
    Bot = 1,
    Guest = 2,
    User = 3,
    Operator = 4,
    Super = 5,
    Link = 6,
    Admin = 7,
}

impl Credentials {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Bot),
            2 => Some(Self::Guest),
            3 => Some(Self::User),
            4 => Some(Self::Operator),
            5 => Some(Self::Super),
            6 => Some(Self::Link),
            7 => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Protocol state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum UserState {
    Connecting = 0,
    Protocol = 1,
    Identify = 2,
    Verify = 3,
    Normal = 4,
    Cleanup = 5,
    Disconnected = 6,
}

impl UserState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Connecting),
            1 => Some(Self::Protocol),
            2 => Some(Self::Identify),
            3 => Some(Self::Verify),
            4 => Some(Self::Normal),
            5 => Some(Self::Cleanup),
            6 => Some(Self::Disconnected),
            _ => None,
        }
    }
}

/// Why a session is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum QuitReason {
    Unknown = 0,
    Normal = 1,
    Timeout = 2,
    SocketError = 3,
    ProtocolError = 4,
    Kicked = 5,
    Banned = 6,
    HubDisabled = 7,
    Ghost = 8,
}

impl QuitReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Normal),
            2 => Some(Self::Timeout),
            3 => Some(Self::SocketError),
            4 => Some(Self::ProtocolError),
            5 => Some(Self::Kicked),
            6 => Some(Self::Banned),
            7 => Some(Self::HubDisabled),
            8 => Some(Self::Ghost),
            _ => None,
        }
    }

    /// Peers must drop direct connections to sessions removed for these reasons.
    pub fn forces_disconnect(self) -> bool {
        matches!(self, Self::Kicked | Self::Banned)
    }
}

/// Declared sharing counters, summed into hub-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub shared_size: u64,
    pub shared_files: u64,
}

/// A connected client.
#[derive(Debug)]
pub struct User {
    sid: Sid,
    cid: String,
    nick: String,
    /// Published identity line (the user's INF), forwarded verbatim.
    info: Bytes,
    limits: Limits,
    credentials: AtomicU8,
    state: AtomicU8,
    quit_reason: AtomicU8,
    flags: AtomicU32,
    send_queue_size: AtomicUsize,
}

impl User {
    pub fn new(
        sid: Sid,
        cid: impl Into<String>,
        nick: impl Into<String>,
        info: Bytes,
        limits: Limits,
        credentials: Credentials,
    ) -> Self {
        Self {
            sid,
            cid: cid.into(),
            nick: nick.into(),
            info,
            limits,
            credentials: AtomicU8::new(credentials as u8),
            state: AtomicU8::new(UserState::Connecting as u8),
            quit_reason: AtomicU8::new(QuitReason::Unknown as u8),
            flags: AtomicU32::new(0),
            send_queue_size: AtomicUsize::new(0),
        }
    }

    pub fn sid(&self) -> Sid {
        self.sid
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn info(&self) -> &Bytes {
        &self.info
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_u8(self.credentials.load(Ordering::Acquire)).unwrap_or(Credentials::None)
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.credentials.store(credentials as u8, Ordering::Release);
    }

    pub fn state(&self) -> UserState {
        UserState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(UserState::Disconnected)
    }

    pub fn set_state(&self, state: UserState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn quit_reason(&self) -> QuitReason {
        QuitReason::from_u8(self.quit_reason.load(Ordering::Acquire)).unwrap_or(QuitReason::Unknown)
    }

    pub fn set_quit_reason(&self, reason: QuitReason) {
        self.quit_reason.store(reason as u8, Ordering::Release);
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags.load(Ordering::Acquire) & flag != 0
    }

    pub fn set_flag(&self, flag: u32) {
        self.flags.fetch_or(flag, Ordering::AcqRel);
    }

    pub fn unset_flag(&self, flag: u32) {
        self.flags.fetch_and(!flag, Ordering::AcqRel);
    }

    /// Bytes queued for this user but not yet written to the socket.
    pub fn send_queue_size(&self) -> usize {
        self.send_queue_size.load(Ordering::Acquire)
    }

    pub fn set_send_queue_size(&self, bytes: usize) {
        self.send_queue_size.store(bytes, Ordering::Release);
    }

    /// Fully logged in and not yet torn down.
    pub fn is_logged_in(&self) -> bool {
        self.state() == UserState::Normal && self.credentials() != Credentials::None
    }
}
