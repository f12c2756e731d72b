use std::future::Future;

use engine_logging::engine_warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl-C, or SIGTERM on unix. The harvest loop notices at its next
/// check, saves and exits.
pub fn spawn_shutdown_listener(token: CancellationToken) -> JoinHandle<()> {
    cancel_on(token, wait_for_signal())
}

/// Cancel `token` once `signal` resolves with the name of what was received.
fn cancel_on<F>(token: CancellationToken, signal: F) -> JoinHandle<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    tokio::spawn(async move {
        let name = signal.await;
        engine_warn!("Received {}; finishing the current step before exiting", name);
        token.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            engine_warn!("Could not listen for SIGTERM: {}", err);
            let _ = tokio::signal::ctrl_c().await;
            return "Ctrl-C";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "Ctrl-C",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl-C"
}
