use crate::shutdown::ShutdownSender;

/// Forwards Ctrl+C (and SIGTERM on unix) into the shutdown broadcast.
///
/// The task also exits when something else sends on the channel first.
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::select! {
            _ = shutdown_rx.recv() => {}
            signal = wait_for_signal() => {
                tracing::info!("{} received, stopping run", signal);
                drop(shutdown_tx.send(()));
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", err);
            None
        }
    };
    let sigterm = async {
        let Some(stream) = terminate.as_mut() else {
            return std::future::pending::<()>().await;
        };
        stream.recv().await;
    };

    tokio::select! {
        name = interrupt() => name,
        () = sigterm => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    interrupt().await
}

async fn interrupt() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl+C listener failed: {}", err);
    }
    "Interrupt"
}
