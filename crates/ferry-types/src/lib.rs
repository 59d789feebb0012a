//! Shared, dependency-free vocabulary types for the ferry relay.
//!
//! Kept in its own crate (no `tokio`, no I/O) so that both the engine
//! and the client session can depend on it without pulling each other in.

use std::fmt;

/// Which role a connection announced itself as during onboarding.
///
/// Carried as a single byte inside a `'b'` wire frame (see `ferry-wire`).
/// `Send = 0x01`, `Recv = 0x02`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Send,
    Recv,
}

impl Side {
    pub const SEND_BYTE: u8 = 0x01;
    pub const RECV_BYTE: u8 = 0x02;

    pub fn to_byte(self) -> u8 {
        match self {
            Side::Send => Self::SEND_BYTE,
            Side::Recv => Self::RECV_BYTE,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = u8;

    fn try_from(b: u8) -> Result<Self, u8> {
        match b {
            Self::SEND_BYTE => Ok(Side::Send),
            Self::RECV_BYTE => Ok(Side::Recv),
            other => Err(other),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Send => write!(f, "sender"),
            Side::Recv => write!(f, "receiver"),
        }
    }
}
