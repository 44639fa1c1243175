//! OS signal handling for coordinated shutdown

use tokio::sync::watch;
use tracing::{info, warn};

/// Spawn the termination-signal listener.
///
/// Returns a receiver that flips to `true` when SIGINT or SIGTERM is first
/// received. The first signal only requests shutdown; the coordinating task
/// is responsible for draining the consumer. A second signal while shutdown
/// is in progress exits the process immediately.
pub fn listen() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(signal, "termination signal received, requesting shutdown");
        if tx.send(true).is_err() {
            return;
        }

        let signal = wait_for_signal().await;
        warn!(signal, "second termination signal, exiting immediately");
        std::process::exit(130);
    });

    rx
}

/// Wait for a termination signal, returning its name.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::ctrl_c;

    ctrl_c().await.expect("failed to register Ctrl+C handler");
    "Ctrl+C"
}
