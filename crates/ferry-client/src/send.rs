//! The send state machine: `INIT -> ANNOUNCED -> WAITING_SECRET ->
//! WAITING_RECV -> STREAMING -> DONE | FAILED`.
//!
//! Mirrors `examples/original_source/pkg/client/service.go`'s
//! `service.Send`, translated from a `chan error` result into a
//! `tokio::sync::oneshot`: the secret is known synchronously (after
//! one round trip), but the wait for a receiver and the file copy must
//! not block the caller from acting on the secret, so they run on a
//! spawned task whose outcome arrives through the returned handle.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;

use ferry_types::Side;
use ferry_wire::{Decoder, Encoder};

use crate::error::SessionError;

/// Result of a completed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub bytes_sent: u64,
}

/// A send session past the point where its secret is known.
///
/// Print/display `secret` for out-of-band delivery to the receiver,
/// then call [`SendHandle::wait`] to block until the transfer
/// completes or fails.
pub struct SendHandle {
    pub secret: String,
    result: oneshot::Receiver<Result<SendOutcome, SessionError>>,
}

impl SendHandle {
    pub async fn wait(self) -> Result<SendOutcome, SessionError> {
        self.result.await.unwrap_or(Err(SessionError::Aborted))
    }
}

/// Connects the send side of a transfer: announces `SEND`, receives
/// the secret, then spawns the wait-for-receiver-and-stream phase.
///
/// `conn` must already be a connected stream to the relay — dialing is
/// left to the caller.
pub async fn start<C, R>(mut conn: C, name: String, mut body: R, length: i64) -> Result<SendHandle, SessionError>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    // INIT -> ANNOUNCED
    Encoder::new(&mut conn).encode_byte(Side::Send.to_byte()).await?;

    // ANNOUNCED -> WAITING_RECV (secret now known)
    let secret = Decoder::new(&mut conn).decode_string().await?;

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = stream_after_ready(conn, &mut body, name, length).await;
        let _ = tx.send(result);
    });

    Ok(SendHandle { secret, result: rx })
}

async fn stream_after_ready<C, R>(
    mut conn: C,
    body: &mut R,
    name: String,
    length: i64,
) -> Result<SendOutcome, SessionError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    // WAITING_RECV -> STREAMING: must observe the RECV ready byte.
    let ready = Decoder::new(&mut conn).decode_byte().await?;
    if ready != Side::Recv.to_byte() {
        return Err(SessionError::UnexpectedReadySignal { got: ready });
    }

    // Name length is only validated here, not before this point: the
    // wire ordering (ready byte precedes name) is mandatory, and an
    // oversize name must fail as a value-error *after* the ready
    // signal, not abort the session before a receiver ever joins.
    if let Err(e) = Encoder::new(&mut conn).encode_string(&name).await {
        return Err(match e {
            ferry_wire::WireError::StringTooLong { len } => SessionError::NameTooLong { len },
            other => SessionError::Wire(other),
        });
    }

    Encoder::new(&mut conn).encode_stream(body, length).await?;

    // STREAMING -> DONE
    Ok(SendOutcome {
        bytes_sent: length.max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn surfaces_secret_before_the_receiver_joins() {
        let (mut relay, client) = duplex(4096);

        let body = std::io::Cursor::new(b"hello".to_vec());
        let handle_fut = start(client, "greet.txt".to_string(), body, 5);

        // Relay side of the handshake, played out manually.
        let mut dec = Decoder::new(&mut relay);
        let side = dec.decode_byte().await.unwrap();
        assert_eq!(side, Side::Send.to_byte());

        let mut enc = Encoder::new(&mut relay);
        enc.encode_string("sekret").await.unwrap();

        let handle = handle_fut.await.unwrap();
        assert_eq!(handle.secret, "sekret");

        // Now send the ready signal and read the rest of the stream.
        let mut enc = Encoder::new(&mut relay);
        enc.encode_byte(Side::Recv.to_byte()).await.unwrap();

        let outcome = handle.wait().await.unwrap();
        assert_eq!(outcome.bytes_sent, 5);

        let mut dec = Decoder::new(&mut relay);
        let name = dec.decode_string().await.unwrap();
        assert_eq!(name, "greet.txt");
        let mut reader = dec.decode_stream().await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn oversize_name_fails_after_the_ready_signal_not_before() {
        let (mut relay, client) = duplex(4096);
        let body = std::io::Cursor::new(Vec::new());
        let oversize_name = "x".repeat(256);

        let handle_fut = start(client, oversize_name, body, 0);

        let mut dec = Decoder::new(&mut relay);
        dec.decode_byte().await.unwrap();
        let mut enc = Encoder::new(&mut relay);
        enc.encode_string("sekret").await.unwrap();

        let handle = handle_fut.await.unwrap();
        assert_eq!(handle.secret, "sekret");

        let mut enc = Encoder::new(&mut relay);
        enc.encode_byte(Side::Recv.to_byte()).await.unwrap();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, SessionError::NameTooLong { len: 256 }));
    }

    #[tokio::test]
    async fn unexpected_ready_byte_fails_the_session() {
        let (mut relay, client) = duplex(4096);
        let body = std::io::Cursor::new(Vec::new());

        let handle_fut = start(client, "f".to_string(), body, 0);

        let mut dec = Decoder::new(&mut relay);
        dec.decode_byte().await.unwrap();
        let mut enc = Encoder::new(&mut relay);
        enc.encode_string("sekret").await.unwrap();

        let handle = handle_fut.await.unwrap();

        // Send SEND (0x01) instead of RECV (0x02) — protocol violation.
        let mut enc = Encoder::new(&mut relay);
        enc.encode_byte(Side::Send.to_byte()).await.unwrap();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, SessionError::UnexpectedReadySignal { got } if got == Side::Send.to_byte()));
    }
}
