use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::domain::Target;

/// Longest response line accepted, terminator included.
pub const MAX_RESPONSE_LINE: u64 = 65_536;

/// Opens point-to-point connections to the run target.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a connection. Timeouts are applied by the caller.
    async fn connect(&self, target: &Target) -> io::Result<Box<dyn Connection>>;
}

/// An established connection, owned by exactly one worker.
#[async_trait]
pub trait Connection: Send {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Appends one line (terminator included) to `line` and returns the
    /// number of bytes read. `Ok(0)` means the peer closed the stream.
    /// Lines longer than [`MAX_RESPONSE_LINE`] fail with `InvalidData`.
    async fn read_line(&mut self, line: &mut String) -> io::Result<usize>;

    async fn close(&mut self) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &Target) -> io::Result<Box<dyn Connection>> {
        let stream = TcpStream::connect((target.host.as_str(), target.port)).await?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY on {}: {}", target, err);
        }
        Ok(Box::new(TcpConnection {
            stream: BufReader::new(stream),
        }))
    }
}

struct TcpConnection {
    stream: BufReader<TcpStream>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    async fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        let read = (&mut self.stream)
            .take(MAX_RESPONSE_LINE)
            .read_line(line)
            .await?;
        let at_limit = u64::try_from(read).is_ok_and(|bytes| bytes >= MAX_RESPONSE_LINE);
        if at_limit && !line.ends_with('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("response line exceeds {} bytes", MAX_RESPONSE_LINE),
            ));
        }
        Ok(read)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.get_mut().shutdown().await
    }
}
