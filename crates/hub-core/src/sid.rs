//! Session identifiers.
//!
//! A SID is a 20-bit number rendered on the wire as four base32
//! characters (`A-Z`, `2-7`), most significant group first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Exclusive upper bound of the SID space. SID 0 is never assigned.
pub const SID_MAX: u32 = 1 << 20;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Numeric session identifier, unique among live sessions.
///
/// Valid values are below `SID_MAX`; only the low 20 bits are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(pub u32);

impl Sid {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Sid {
    fn from(value: u32) -> Self {
        Sid(value)
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_assert!(self.0 < SID_MAX, "sid {} out of range", self.0);
        let v = self.0 & (SID_MAX - 1);
        let mut out = [0u8; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = 5 * (3 - i);
            *slot = BASE32_ALPHABET[((v >> shift) & 0x1f) as usize];
        }
        // alphabet is ASCII
        f.write_str(std::str::from_utf8(&out).map_err(|_| fmt::Error)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SidParseError {
    #[error("sid must be 4 characters, got {0}")]
    BadLength(usize),

    #[error("invalid base32 character {0:?} in sid")]
    BadCharacter(char),
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 {
            return Err(SidParseError::BadLength(s.len()));
        }
        let mut v = 0u32;
        for c in s.chars() {
            let digit = match c {
                'A'..='Z' => c as u32 - 'A' as u32,
                '2'..='7' => c as u32 - '2' as u32 + 26,
                _ => return Err(SidParseError::BadCharacter(c)),
            };
            v = (v << 5) | digit;
        }
        Ok(Sid(v))
    }
}
