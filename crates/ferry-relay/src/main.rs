//! The relay binary: accepts sender and receiver connections, pairs
//! them by secret, and forwards sender bytes to the paired receiver.
//!
//! Usage: `ferry-relay <host:port>` (a bare `:<port>` binds all
//! interfaces, matching `relay :8080`).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use ferry_engine::{RandomSecrets, Secrets};

/// Senders that wait longer than this with no receiver are evicted.
/// There is no wire-level way for a sender to learn it was evicted
/// beyond its connection closing — resolved server-side with a timeout
/// rather than a new protocol message.
const IDLE_SENDER_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: ferry-relay <host:port>");
        std::process::exit(1);
    }

    let addr = parse_listen_addr(&args[1])?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let listener = TcpListener::from_std(socket.into())?;
    info!(%addr, "relay listening");

    let table = ferry_engine::spawn_table::<TcpStream>();
    let secrets: Arc<dyn Secrets> = Arc::new(RandomSecrets::default());

    tokio::spawn(ferry_engine::listener::run_idle_sweep(
        table.clone(),
        IDLE_SENDER_TIMEOUT,
        IDLE_SWEEP_INTERVAL,
    ));

    tokio::select! {
        _ = ferry_engine::listener::run(listener, secrets, table) => {}
        _ = shutdown_signal() => {
            info!("shutting down");
        }
    }

    Ok(())
}

/// Accepts either `:<port>` (bind all interfaces, like the original
/// Go relay's `net.Listen("tcp", addr)`) or an explicit `host:port`.
fn parse_listen_addr(arg: &str) -> anyhow::Result<SocketAddr> {
    if let Some(port) = arg.strip_prefix(':') {
        return Ok(format!("0.0.0.0:{port}").parse()?);
    }
    Ok(arg.parse()?)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received Ctrl+C"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received Ctrl+C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_binds_all_interfaces() {
        let addr = parse_listen_addr(":9090").unwrap();
        assert_eq!(addr, "0.0.0.0:9090".parse().unwrap());
    }

    #[test]
    fn explicit_host_is_preserved() {
        let addr = parse_listen_addr("127.0.0.1:9090").unwrap();
        assert_eq!(addr, "127.0.0.1:9090".parse().unwrap());
    }
}
