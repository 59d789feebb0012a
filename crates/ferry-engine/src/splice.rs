//! The splice task: runs once a sender and receiver are paired,
//! forwards sender bytes to the receiver, and tears the pair down.
//!
//! Direction is strictly half-duplex — sender to receiver only. The
//! receiver's connection is never read from here; the client-side
//! receive protocol only ever reads from the relay after sending its
//! secret, so nothing meaningful would arrive on that direction
//! anyway, but the engine must not attempt it regardless.

use crate::table::{self, Conn, TableHandle};

pub(crate) async fn run<C: Conn>(mut send: C, mut recv: C, secret: String, table: TableHandle<C>) {
    // "Receiver ready" signal: tells the client-side send state machine
    // it may leave WAITING_RECV and start streaming the file. Must be
    // written before any byte of the copy begins.
    if let Err(e) = table::send_ready_signal(&mut send).await {
        tracing::warn!(%secret, error = %e, "failed to send ready signal, aborting splice");
        table.close(secret);
        return;
    }

    match tokio::io::copy(&mut send, &mut recv).await {
        Ok(bytes) => {
            tracing::info!(%secret, bytes, "splice complete");
        }
        Err(e) => {
            tracing::warn!(%secret, error = %e, "splice ended with an error");
        }
    }

    table.close(secret);
}
