use tracing::info;

use crate::args::EchoArgs;
use crate::echo;
use crate::error::AppResult;
use crate::shutdown::shutdown_channel;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

/// Serves the echo peer until Ctrl+C or SIGTERM.
pub(crate) async fn run_echo(args: &EchoArgs) -> AppResult<()> {
    let listener = echo::bind(&args.bind).await?;
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let served = echo::serve(listener, shutdown_rx).await;
    signal_handle.abort();
    let accepted = served?;
    info!("Echo server stopped after {} connection(s)", accepted);
    Ok(())
}
