//! A single connection to the system under test.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::timeout;
use tracing::debug;

use super::transport::WireTransport;
use crate::error::{TestUserError, UserResult};

/// Default per-call deadline for `run_sql`, matching the original client's
/// poll timeout.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// A named client connection to the system under test.
///
/// Framing: a request is the payload followed by a single NUL byte. A
/// response is read until the first NUL byte; bytes following that NUL in
/// the same read are not part of the response and are discarded (the
/// protocol never pipelines two responses into one `recv`). The trailing
/// NUL and the byte immediately preceding it are stripped before the text
/// is handed back, matching the terminator convention the system under test
/// uses to mark its own line endings.
#[derive(Debug)]
pub struct WireClient {
    name: String,
    transport: WireTransport,
    /// Scratch buffer for a partial frame; never retained across `run_sql`
    /// calls — each call starts and must finish a complete frame.
    scratch: BytesMut,
}

impl WireClient {
    pub fn new(name: impl Into<String>, transport: WireTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            scratch: BytesMut::with_capacity(4096),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send `sql` and wait for a complete NUL-terminated response, bounded
    /// by `deadline`. Returns the decoded text with exactly one trailing
    /// newline, matching the original's `.strip() + '\n'` normalization.
    pub async fn run_sql(&mut self, sql: &str, deadline: Duration) -> UserResult<String> {
        debug!(connection = %self.name, %sql, "sending request");
        self.scratch.clear();
        let mut request = Vec::with_capacity(sql.len() + 1);
        request.extend_from_slice(sql.as_bytes());
        request.push(0);
        self.transport.write_all(&request).await?;

        let result = timeout(deadline, self.read_until_nul())
            .await
            .map_err(|_| TestUserError::Timeout(deadline))??;
        debug!(connection = %self.name, response_len = result.len(), "received response");
        Ok(result)
    }

    async fn read_until_nul(&mut self) -> UserResult<String> {
        let mut buf = [0u8; 8192];
        loop {
            if let Some(pos) = self.scratch.iter().position(|&b| b == 0) {
                let frame = self.scratch.split_to(pos);
                self.scratch.clear();
                return Ok(Self::decode_frame(&frame));
            }
            let n = self.transport.read(&mut buf).await?;
            self.scratch.extend_from_slice(&buf[..n]);
        }
    }

    /// Strip the terminator and normalize whitespace the way the original
    /// client does: `frame` is everything before the NUL, and the protocol
    /// pads one extra byte ahead of its own NUL terminator, so the byte
    /// immediately preceding the NUL is dropped along with it before
    /// trimming and appending a single trailing newline.
    fn decode_frame(frame: &[u8]) -> String {
        let payload = frame.len().checked_sub(1).map_or(frame, |n| &frame[..n]);
        let text = String::from_utf8_lossy(payload);
        let trimmed = text.trim();
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn round_trips_a_single_read_response() {
        let (client_side, mut server_side) = UnixStream::pair().unwrap();
        let mut client = WireClient::new("default", WireTransport::Unix(client_side));

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let n = server_side.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"SELECT 1\0");
            // The byte immediately before the NUL is the protocol's own
            // padding byte, not payload, so "1\0" carries no real payload.
            server_side.write_all(b"1\0").await.unwrap();
        });

        let response = client.run_sql("SELECT 1", Duration::from_secs(1)).await.unwrap();
        assert_eq!(response, "\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn assembles_a_frame_split_across_reads() {
        let (client_side, mut server_side) = UnixStream::pair().unwrap();
        let mut client = WireClient::new("default", WireTransport::Unix(client_side));

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            server_side.read(&mut buf).await.unwrap();
            server_side.write_all(b"a | b").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            // Trailing pad byte before the NUL is dropped along with it.
            server_side.write_all(b"X\0").await.unwrap();
        });

        let response = client
            .run_sql("SELECT * FROM t", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response, "a | b\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn times_out_when_no_terminator_arrives() {
        let (client_side, _server_side) = UnixStream::pair().unwrap();
        let mut client = WireClient::new("default", WireTransport::Unix(client_side));

        let result = client.run_sql("SELECT 1", Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TestUserError::Timeout(_))));
    }
}
