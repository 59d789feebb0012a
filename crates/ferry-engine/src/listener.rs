//! The acceptor loop and the optional idle-sender sweep.
//!
//! Listener construction (binding the socket, setting `SO_REUSEADDR`
//! etc.) is left to the caller, so this module only ever takes an
//! already-bound `TcpListener`, mirroring
//! `examples/original_source/cmd/relay/main.go` where `main` does the
//! `net.Listen` call and hands the listener to the relay.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::secrets::Secrets;
use crate::table::TableHandle;

/// Accepts connections forever, spawning one onboarding task per
/// connection. Never returns: an `accept` failure is logged and the
/// loop tries again, the same way
/// `haven-gateway/src/tcp_relay.rs`'s accept loop treats a bad accept
/// as transient rather than fatal.
pub async fn run(listener: TcpListener, secrets: Arc<dyn Secrets>, table: TableHandle<TcpStream>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::info!(%addr, "accepted connection");
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::warn!(%addr, error = %e, "failed to set TCP_NODELAY");
                }
                let secrets = secrets.clone();
                let table = table.clone();
                tokio::spawn(async move {
                    crate::onboarding::onboard(stream, secrets, table).await;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}

/// Runs the optional idle-sender sweep on a fixed interval, evicting
/// any sender that has waited longer than `idle_timeout` without a
/// receiver joining. Never returns; spawn it as its own task. Disabled
/// entirely if the caller never spawns it — the base engine has no
/// timeouts of its own.
pub async fn run_idle_sweep<C: crate::table::Conn>(
    table: TableHandle<C>,
    idle_timeout: Duration,
    check_interval: Duration,
) {
    let mut interval = tokio::time::interval(check_interval);
    loop {
        interval.tick().await;
        table.sweep_idle(idle_timeout);
    }
}
