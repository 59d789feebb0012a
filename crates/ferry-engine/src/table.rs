//! The pairing table and its actor.
//!
//! All mutations to the `secret -> Transfer` map are serialized through
//! a single task consuming an unbounded command channel, mirroring
//! `examples/original_source/pkg/proxy/relay.go`'s `Service.action`
//! channel-of-closures. Here the channel carries a closed `Command`
//! enum instead of `func()` closures — idiomatic Rust favors a typed
//! message over boxing arbitrary closures, and it keeps every mutation
//! the actor can perform visible at a glance.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use ferry_types::Side;
use ferry_wire::Encoder;

/// Any connection type the engine can onboard and splice.
///
/// `TcpStream` satisfies this for the real relay binary;
/// `tokio::io::DuplexStream` halves satisfy it for in-process tests.
pub trait Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Conn for T {}

/// Commands accepted by the table actor. Every variant must be
/// handleable without blocking on network I/O — closing a connection
/// is delegated to a detached task rather than awaited inline, to keep
/// the actor loop free to process the next command immediately.
pub enum Command<C> {
    JoinSend { conn: C, secret: String },
    JoinRecv { conn: C, secret: String },
    Close { secret: String },
    SweepIdle { older_than: Duration },
}

enum TransferState<C> {
    WaitingForReceiver { send: C, joined_at: Instant },
    Splicing,
}

/// A cheaply-cloneable handle to a running table actor.
pub struct TableHandle<C> {
    tx: mpsc::UnboundedSender<Command<C>>,
}

impl<C> Clone for TableHandle<C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<C: Conn> TableHandle<C> {
    pub fn join_send(&self, conn: C, secret: String) {
        let _ = self.tx.send(Command::JoinSend { conn, secret });
    }

    pub fn join_recv(&self, conn: C, secret: String) {
        let _ = self.tx.send(Command::JoinRecv { conn, secret });
    }

    /// Idempotent against double submission: a secret not present in
    /// the table is simply a no-op.
    pub fn close(&self, secret: String) {
        let _ = self.tx.send(Command::Close { secret });
    }

    pub fn sweep_idle(&self, older_than: Duration) {
        let _ = self.tx.send(Command::SweepIdle { older_than });
    }
}

/// Spawns the table actor and returns a handle to it.
pub fn spawn_table<C: Conn>() -> TableHandle<C> {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = TableHandle { tx: tx.clone() };
    tokio::spawn(run_actor(rx, handle.clone()));
    handle
}

async fn run_actor<C: Conn>(mut rx: mpsc::UnboundedReceiver<Command<C>>, self_handle: TableHandle<C>) {
    let mut table: HashMap<String, TransferState<C>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::JoinSend { conn, secret } => {
                if table.contains_key(&secret) {
                    // Should be vanishingly rare — secrets are fresh per sender.
                    tracing::warn!(%secret, "duplicate secret on sender join, closing");
                    detach_close(conn);
                    continue;
                }
                tracing::debug!(%secret, "sender waiting for receiver");
                table.insert(
                    secret,
                    TransferState::WaitingForReceiver {
                        send: conn,
                        joined_at: Instant::now(),
                    },
                );
            }
            Command::JoinRecv { conn, secret } => match table.get_mut(&secret) {
                None => {
                    tracing::warn!(%secret, "unknown secret on receiver join, closing");
                    detach_close(conn);
                }
                Some(TransferState::Splicing) => {
                    tracing::warn!(%secret, "transfer already claimed, closing extra receiver");
                    detach_close(conn);
                }
                Some(state @ TransferState::WaitingForReceiver { .. }) => {
                    let TransferState::WaitingForReceiver { send, .. } =
                        std::mem::replace(state, TransferState::Splicing)
                    else {
                        unreachable!()
                    };
                    tracing::info!(%secret, "receiver joined, starting splice");
                    tokio::spawn(crate::splice::run(send, conn, secret, self_handle.clone()));
                }
            },
            Command::Close { secret } => {
                tracing::debug!(%secret, "closing transfer");
                if let Some(TransferState::WaitingForReceiver { send, .. }) = table.remove(&secret) {
                    detach_close(send);
                }
                // `Splicing` entries own no connections here — the splice
                // task holds them and closes them itself before it submits
                // this very Close command.
            }
            Command::SweepIdle { older_than } => {
                let now = Instant::now();
                let expired: Vec<String> = table
                    .iter()
                    .filter_map(|(secret, state)| match state {
                        TransferState::WaitingForReceiver { joined_at, .. }
                            if now.duration_since(*joined_at) >= older_than =>
                        {
                            Some(secret.clone())
                        }
                        _ => None,
                    })
                    .collect();

                for secret in expired {
                    tracing::info!(%secret, "evicting idle sender with no receiver");
                    if let Some(TransferState::WaitingForReceiver { send, .. }) = table.remove(&secret) {
                        detach_close(send);
                    }
                }
            }
        }
    }
}

/// Closes a connection on a detached task so the actor never awaits
/// socket I/O directly.
fn detach_close<C: Conn>(conn: C) {
    tokio::spawn(async move {
        let _ = close_conn(conn).await;
    });
}

/// Shuts down the write half (best-effort) and drops the connection.
pub(crate) async fn close_conn<C: Conn>(mut conn: C) -> std::io::Result<()> {
    let _ = conn.shutdown().await;
    Ok(())
}

/// Encodes the "receiver-ready" signal onto `conn`: a single `'b'`
/// frame carrying [`Side::Recv`]'s byte.
pub(crate) async fn send_ready_signal<C: Conn>(conn: &mut C) -> Result<(), ferry_wire::WireError> {
    Encoder::new(conn).encode_byte(Side::Recv.to_byte()).await
}
