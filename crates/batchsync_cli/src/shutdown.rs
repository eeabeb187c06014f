use std::sync::LazyLock;

use console::Term;
use tokio::sync::watch;

/// Global shutdown signal for graceful termination.
static SHUTDOWN: LazyLock<watch::Sender<bool>> = LazyLock::new(|| watch::channel(false).0);

/// Check if shutdown has been requested.
#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    *SHUTDOWN.borrow()
}

/// Resolve once shutdown has been requested.
pub(crate) async fn shutdown_requested() {
    let mut rx = SHUTDOWN.subscribe();
    // The sender lives in a static, so the channel never closes.
    let _ = rx.wait_for(|requested| *requested).await;
}

/// Request shutdown.
#[inline]
fn request_shutdown() {
    SHUTDOWN.send_replace(true);
}

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C asks running syncs to cancel; the second exits with 130.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, cancelling running syncs...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, cancelling running syncs");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
