//! The receive binary: connects to a relay with a secret and writes
//! the incoming file into an output directory.
//!
//! Usage: `ferry-receive <relay-host:port> <secret-code> <output-directory>`.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::net::TcpStream;

use ferry_client::receive_claim;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: ferry-receive <relay-host:port> <secret-code> <output-directory>");
        std::process::exit(1);
    }
    let addr = &args[1];
    let secret = &args[2];
    let dir = PathBuf::from(&args[3]);

    let is_dir = tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        eprintln!("output must be an existing directory");
        std::process::exit(1);
    }

    let conn = TcpStream::connect(addr).await?;
    conn.set_nodelay(true)?;

    // The name is known as soon as the relay forwards it, before any
    // byte of the stream arrives, so the real output file can be
    // opened up front instead of staging into a placeholder path.
    let claimed = receive_claim(conn, secret).await?;
    let final_path = sanitized_output_path(&dir, &claimed.name);
    let mut out = File::create(&final_path).await?;

    let outcome = claimed.copy_to(&mut out).await?;

    eprintln!("received {} bytes as {}", outcome.bytes_received, final_path.display());

    Ok(())
}

/// Joins a server-supplied file name onto the output directory,
/// stripping any path components the server might have sent — only
/// the final path segment survives, so `"../../etc/passwd"` becomes
/// `passwd` and an absolute path contributes only its basename. Falls
/// back to a fixed name if sanitization leaves nothing usable (e.g.
/// the sender announced an empty name or `".."`).
fn sanitized_output_path(dir: &Path, name: &str) -> PathBuf {
    match Path::new(name).file_name() {
        Some(base) => dir.join(base),
        None => dir.join("ferry-receive.unnamed"),
    }
}
