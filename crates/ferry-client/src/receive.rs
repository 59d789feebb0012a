//! The receive state machine: `INIT -> ANNOUNCED -> CLAIMED ->
//! RECEIVING -> DONE | FAILED`. There is no separate "waiting" phase
//! observable from the receiver's side — it blocks inside the relay's
//! table actor until a sender with the matching secret shows up, then
//! the relay starts forwarding bytes immediately.
//!
//! Claiming and streaming are split into two steps so the caller
//! learns the file name before committing to a sink: it can open the
//! real output file only once `name` is known, instead of staging into
//! a placeholder path and renaming afterward.

use tokio::io::{AsyncRead, AsyncWrite};

use ferry_types::Side;
use ferry_wire::Decoder;

use crate::error::SessionError;

/// Result of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub name: String,
    pub bytes_received: u64,
}

/// A receive session that has claimed its secret and learned the
/// sender's file name, but hasn't yet streamed any bytes.
///
/// `name` is available as soon as [`claim`] returns, before the caller
/// opens any output file.
pub struct ClaimedTransfer<C> {
    pub name: String,
    conn: C,
}

impl<C: AsyncRead + AsyncWrite + Unpin> ClaimedTransfer<C> {
    /// `CLAIMED -> RECEIVING -> DONE`: decodes the stream frame and
    /// copies it into `sink`. Reading fewer than the announced number
    /// of bytes is a [`SessionError::ShortRead`].
    pub async fn copy_to<W>(mut self, mut sink: W) -> Result<ReceiveOutcome, SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut dec = Decoder::new(&mut self.conn);
        let mut reader = dec.decode_stream().await?;
        let want = reader.limit();
        let bytes_received = tokio::io::copy(&mut reader, &mut sink).await?;
        // `Take::limit()` after a completed copy reports how many of
        // the announced bytes were never delivered: zero means the
        // sender's stream satisfied the full count, anything else
        // means the underlying connection hit EOF early.
        if reader.limit() > 0 {
            return Err(SessionError::ShortRead {
                want,
                got: bytes_received,
            });
        }

        Ok(ReceiveOutcome {
            name: self.name,
            bytes_received,
        })
    }
}

/// Connects the receive side of a transfer: announces `RECV` with the
/// secret and decodes the sender's file name, returning a
/// [`ClaimedTransfer`] the caller can stream into once it has opened a
/// real output file.
///
/// `conn` must already be a connected stream to the relay.
pub async fn claim<C>(mut conn: C, secret: &str) -> Result<ClaimedTransfer<C>, SessionError>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    use ferry_wire::Encoder;

    // INIT -> ANNOUNCED
    Encoder::new(&mut conn).encode_byte(Side::Recv.to_byte()).await?;
    Encoder::new(&mut conn).encode_string(secret).await?;

    // ANNOUNCED -> CLAIMED
    let name = Decoder::new(&mut conn).decode_string().await?;

    Ok(ClaimedTransfer { name, conn })
}

/// Convenience wrapper over [`claim`] + [`ClaimedTransfer::copy_to`]
/// for callers that already know where the bytes should land (e.g.
/// tests that don't care about the name ahead of time).
pub async fn run<C, W>(conn: C, secret: &str, sink: W) -> Result<ReceiveOutcome, SessionError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    claim(conn, secret).await?.copy_to(sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_wire::Encoder;
    use tokio::io::duplex;

    #[tokio::test]
    async fn full_transfer_round_trips_name_and_bytes() {
        let (mut relay, client) = duplex(4096);
        let mut sink = Vec::new();

        let run_fut = run(client, "sekret", &mut sink);

        let mut dec = Decoder::new(&mut relay);
        assert_eq!(dec.decode_byte().await.unwrap(), Side::Recv.to_byte());
        assert_eq!(dec.decode_string().await.unwrap(), "sekret");

        let mut enc = Encoder::new(&mut relay);
        enc.encode_string("greet.txt").await.unwrap();
        let mut body = std::io::Cursor::new(b"hello".to_vec());
        enc.encode_stream(&mut body, 5).await.unwrap();
        drop(enc);

        let outcome = run_fut.await.unwrap();
        assert_eq!(outcome.name, "greet.txt");
        assert_eq!(outcome.bytes_received, 5);
        assert_eq!(sink, b"hello");
    }

    #[tokio::test]
    async fn name_is_known_before_any_byte_of_the_stream_is_read() {
        let (mut relay, client) = duplex(4096);

        let claim_fut = claim(client, "sekret");

        let mut dec = Decoder::new(&mut relay);
        dec.decode_byte().await.unwrap();
        dec.decode_string().await.unwrap();

        let mut enc = Encoder::new(&mut relay);
        enc.encode_string("greet.txt").await.unwrap();
        // Deliberately don't send the stream frame yet — claim() must
        // resolve from the name alone, without waiting on it.
        let claimed = tokio::time::timeout(std::time::Duration::from_millis(200), claim_fut)
            .await
            .expect("claim resolved without the stream frame")
            .unwrap();
        assert_eq!(claimed.name, "greet.txt");

        let mut body = std::io::Cursor::new(b"hello".to_vec());
        enc.encode_stream(&mut body, 5).await.unwrap();
        drop(enc);

        let mut sink = Vec::new();
        let outcome = claimed.copy_to(&mut sink).await.unwrap();
        assert_eq!(outcome.bytes_received, 5);
        assert_eq!(sink, b"hello");
    }

    #[tokio::test]
    async fn sender_disconnecting_mid_stream_is_a_short_read() {
        let (mut relay, client) = duplex(4096);
        let mut sink = Vec::new();

        let run_fut = run(client, "sekret", &mut sink);

        let mut dec = Decoder::new(&mut relay);
        dec.decode_byte().await.unwrap();
        dec.decode_string().await.unwrap();

        {
            let mut enc = Encoder::new(&mut relay);
            enc.encode_string("greet.txt").await.unwrap();
            // Announce 1000 bytes but only ever send 10, then drop.
            use tokio::io::AsyncWriteExt;
            enc.get_mut().write_all(&[b'B']).await.unwrap();
            enc.get_mut()
                .write_all(&1000i64.to_be_bytes())
                .await
                .unwrap();
            enc.get_mut().write_all(&[0u8; 10]).await.unwrap();
        }
        drop(relay);

        let err = run_fut.await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::ShortRead { want: 1000, got: 10 }
        ));
    }
}
