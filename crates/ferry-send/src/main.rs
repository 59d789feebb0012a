//! The send binary: connects to a relay, hands it a file, prints the
//! secret as soon as it is assigned, then waits for a receiver.
//!
//! Usage: `ferry-send <relay-host:port> <file-to-send>`.

use std::path::Path;

use tokio::fs::File;
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: ferry-send <relay-host:port> <file-to-send>");
        std::process::exit(1);
    }
    let addr = &args[1];
    let path = Path::new(&args[2]);

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("file path has no usable file name: {}", path.display()))?
        .to_string();

    let metadata = tokio::fs::metadata(path).await?;
    let length = i64::try_from(metadata.len())?;
    let file = File::open(path).await?;

    let conn = TcpStream::connect(addr).await?;
    conn.set_nodelay(true)?;

    let handle = ferry_client::send::start(conn, name, file, length).await?;
    println!("{}", handle.secret);

    let outcome = handle.wait().await?;
    eprintln!("sent {} bytes", outcome.bytes_sent);

    Ok(())
}
