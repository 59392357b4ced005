//! The two stream flavors a wire client can be built over.

use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

use crate::error::{TestUserError, UserResult};

/// Either a Unix-domain stream socket or a TCP loopback socket. Both halves
/// of the framing logic in [`super::client::WireClient`] are shared across
/// the two; only byte transport differs.
#[derive(Debug)]
pub enum WireTransport {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl WireTransport {
    pub async fn connect_unix(path: impl AsRef<Path>) -> UserResult<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::Unix(stream))
    }

    pub async fn connect_tcp(host: &str, port: u16) -> UserResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true).ok();
        Ok(Self::Tcp(stream))
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> UserResult<()> {
        match self {
            Self::Unix(s) => s.write_all(buf).await?,
            Self::Tcp(s) => s.write_all(buf).await?,
        }
        Ok(())
    }

    /// Read at least one byte into `buf`, returning the number of bytes
    /// read. A return of `0` means the peer closed the connection.
    pub async fn read(&mut self, buf: &mut [u8]) -> UserResult<usize> {
        let n = match self {
            Self::Unix(s) => s.read(buf).await?,
            Self::Tcp(s) => s.read(buf).await?,
        };
        if n == 0 {
            return Err(TestUserError::ConnectionClosed);
        }
        Ok(n)
    }
}
