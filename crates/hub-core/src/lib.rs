//! hub-core — shared types, protocol message building, and configuration.
//! All other hub crates depend on this one.

pub mod config;
pub mod message;
pub mod sid;

pub use message::AdcMessage;
pub use sid::{Sid, SidParseError, SID_MAX};
