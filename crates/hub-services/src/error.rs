//! Hub error types.

use hub_core::Sid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// The session list could not be allocated. Fatal to hub startup.
    #[error("failed to allocate session list: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// A recipient's outbound queue refused the message.
    #[error("delivery to sid {sid} failed")]
    DeliveryFailed { sid: Sid },

    /// Every SID in the address space is held by a live session.
    #[error("no free session id ({live} sessions live)")]
    SidSpaceExhausted { live: usize },
}
