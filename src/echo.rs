//! Byte echo peer used as the target of probe runs.
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::shutdown::ShutdownReceiver;

pub const DEFAULT_ECHO_BIND: &str = "0.0.0.0:5050";
const ECHO_BUFFER_SIZE: usize = 64 * 1024;

/// Binds the echo listener.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind(addr: &str) -> AppResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::EchoBind {
            addr: addr.to_owned(),
            source,
        })
}

/// Echoes every received byte back to its sender until shutdown.
///
/// Returns the number of accepted connections.
///
/// # Errors
///
/// Returns an error when the listener address cannot be read.
pub async fn serve(listener: TcpListener, mut shutdown_rx: ShutdownReceiver) -> AppResult<u64> {
    let local = listener.local_addr()?;
    info!("Echo server listening on {}", local);

    let mut connections = JoinSet::new();
    let mut accepted: u64 = 0;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    accepted = accepted.saturating_add(1);
                    debug!("Client connected: {}", peer);
                    connections.spawn(echo_connection(stream, peer));
                }
                Err(err) => warn!("Accept failed: {}", err),
            },
        }
    }

    info!(
        "Echo server on {} stopping; {} connection(s) served",
        local, accepted
    );
    connections.shutdown().await;
    Ok(accepted)
}

async fn echo_connection(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(err) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", peer, err);
    }
    let mut buffer = vec![0_u8; ECHO_BUFFER_SIZE];
    loop {
        let read = match stream.read(&mut buffer).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                debug!("Read from {} failed: {}", peer, err);
                break;
            }
        };
        let Some(chunk) = buffer.get(..read) else {
            break;
        };
        if let Err(err) = stream.write_all(chunk).await {
            debug!("Write to {} failed: {}", peer, err);
            break;
        }
    }
    debug!("Client disconnected: {}", peer);
}
