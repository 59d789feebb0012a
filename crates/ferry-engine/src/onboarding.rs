//! Per-connection onboarding: classify a freshly-accepted connection as
//! sender or receiver, resolve its secret, and hand it to the table
//! actor. Mirrors `examples/original_source/pkg/proxy/relay.go`'s
//! `Service.Onboard`.

use std::sync::Arc;

use ferry_types::Side;
use ferry_wire::{Decoder, Encoder};

use crate::secrets::Secrets;
use crate::table::{self, Conn, TableHandle};

pub async fn onboard<C: Conn>(mut conn: C, secrets: Arc<dyn Secrets>, table: TableHandle<C>) {
    let side_byte = {
        let mut dec = Decoder::new(&mut conn);
        match dec.decode_byte().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "onboarding: failed reading side byte, closing");
                let _ = table::close_conn(conn).await;
                return;
            }
        }
    };

    let side = match Side::try_from(side_byte) {
        Ok(side) => side,
        Err(b) => {
            tracing::warn!(byte = b, "onboarding: invalid side byte, closing");
            let _ = table::close_conn(conn).await;
            return;
        }
    };

    tracing::debug!(%side, "onboarding");

    match side {
        Side::Send => {
            let secret = secrets.generate();
            let result = {
                let mut enc = Encoder::new(&mut conn);
                enc.encode_string(&secret).await
            };
            if let Err(e) = result {
                tracing::warn!(%secret, error = %e, "onboarding: failed sending secret, closing");
                let _ = table::close_conn(conn).await;
                return;
            }
            table.join_send(conn, secret);
        }
        Side::Recv => {
            let secret = {
                let mut dec = Decoder::new(&mut conn);
                dec.decode_string().await
            };
            let secret = match secret {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "onboarding: failed reading secret, closing");
                    let _ = table::close_conn(conn).await;
                    return;
                }
            };
            table.join_recv(conn, secret);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::FixedSecrets;
    use crate::table::spawn_table;
    use ferry_wire::{Decoder as WireDecoder, Encoder as WireEncoder};
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn sender_receives_a_secret_and_joins_the_table() {
        let table: TableHandle<tokio::io::DuplexStream> = spawn_table();
        let secrets: Arc<dyn Secrets> = Arc::new(FixedSecrets::new("abc123"));

        let (mut client, server) = duplex(4096);
        tokio::spawn(onboard(server, secrets, table));

        let mut enc = WireEncoder::new(&mut client);
        enc.encode_byte(Side::Send.to_byte()).await.unwrap();

        let mut dec = WireDecoder::new(&mut client);
        let secret = dec.decode_string().await.unwrap();
        assert_eq!(secret, "abc123");
    }

    #[tokio::test]
    async fn invalid_side_byte_closes_the_connection() {
        let table: TableHandle<tokio::io::DuplexStream> = spawn_table();
        let secrets: Arc<dyn Secrets> = Arc::new(FixedSecrets::new("xx"));

        let (mut client, server) = duplex(4096);
        tokio::spawn(onboard(server, secrets, table));

        let mut enc = WireEncoder::new(&mut client);
        enc.encode_byte(0x99).await.unwrap();

        let mut buf = [0u8; 1];
        let n = tokio::time::timeout(std::time::Duration::from_millis(200), client.read(&mut buf))
            .await
            .expect("closed in time")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn receiver_reads_secret_then_joins_the_table() {
        let table: TableHandle<tokio::io::DuplexStream> = spawn_table();
        let secrets: Arc<dyn Secrets> = Arc::new(FixedSecrets::new("unused"));

        // First onboard a sender so the secret exists in the table.
        let (_send_client, send_server) = duplex(4096);
        table.join_send(send_server, "real-secret".to_string());

        let (mut recv_client, recv_server) = duplex(4096);
        tokio::spawn(onboard(recv_server, secrets, table));

        let mut enc = WireEncoder::new(&mut recv_client);
        enc.encode_byte(Side::Recv.to_byte()).await.unwrap();
        enc.encode_string("real-secret").await.unwrap();

        // The splice task should now send the ready signal over the
        // *sender's* connection, not this one, so just confirm the
        // receiver connection stays open by making sure it isn't closed
        // immediately (i.e. no premature EOF).
        let mut buf = [0u8; 1];
        let result = tokio::time::timeout(std::time::Duration::from_millis(100), recv_client.read(&mut buf)).await;
        assert!(result.is_err(), "receiver connection should remain open, waiting for data");
    }
}
