//! Thin client-side collaborators for the send and receive halves of a
//! transfer. Neither module dials a connection or opens a file: both
//! take an already-connected stream and let the caller own transport
//! and filesystem concerns, matching how
//! `examples/original_source/pkg/client/service.go`'s `Service` leaves
//! dialing to its `cmd/send` and `cmd/receive` callers.

pub mod error;
pub mod receive;
pub mod send;

pub use error::SessionError;
pub use receive::{ClaimedTransfer, ReceiveOutcome, claim as receive_claim, run as receive};
pub use send::{SendHandle, SendOutcome, start as send};
