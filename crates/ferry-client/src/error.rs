//! Client-side session errors.
//!
//! Every error here terminates the owning session; on the send side it
//! is surfaced through [`crate::send::SendHandle::wait`], on the
//! receive side directly as the `Result` of [`crate::receive::run`].

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Wire(#[from] ferry_wire::WireError),

    #[error("expected receiver-ready signal (0x02), got 0x{got:02x}")]
    UnexpectedReadySignal { got: u8 },

    #[error("file name too long: {len} bytes (max 255)")]
    NameTooLong { len: usize },

    #[error("short read: wanted {want} bytes, got {got}")]
    ShortRead { want: u64, got: u64 },

    #[error("send task ended without reporting a result")]
    Aborted,
}
