//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when the
//! process receives a termination signal, and [`signal_listener`], which turns any
//! such future into the supervisor's one-shot stop notification.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal, and what `-stop` sends)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Registered Unix termination signal streams.
#[cfg(unix)]
struct Signals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Registers the handlers; from here on the signals no longer terminate the process.
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(mut self) {
        tokio::select! {
            _ = self.sigint.recv()  => tracing::info!("SIGINT received"),
            _ = self.sigterm.recv() => tracing::info!("SIGTERM received"),
            _ = self.sigquit.recv() => tracing::info!("SIGQUIT received"),
        }
    }
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    Signals::install()?.recv().await;
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(())
}

/// The OS signal future used by [`Supervisor::run`](crate::Supervisor::run).
///
/// On Unix the handlers are registered when this function is called, not when
/// the returned future is first polled. If they cannot be installed the error
/// is logged and the future never completes, so the application keeps running
/// until its processes return.
#[cfg(unix)]
pub(crate) fn os_signal() -> impl Future<Output = ()> + Send + 'static {
    let installed = Signals::install();
    async move {
        match installed {
            Ok(signals) => signals.recv().await,
            Err(e) => {
                tracing::error!(error = %e, "cannot install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// The OS signal future used by [`Supervisor::run`](crate::Supervisor::run).
#[cfg(not(unix))]
pub(crate) fn os_signal() -> impl Future<Output = ()> + Send + 'static {
    async {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!(error = %e, "cannot install signal handlers");
            std::future::pending::<()>().await;
        }
    }
}

/// Spawns the listener: awaits `signal` and fires the returned receiver exactly once.
pub(crate) fn signal_listener<F>(signal: F) -> (JoinHandle<()>, oneshot::Receiver<()>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        signal.await;
        let _ = tx.send(());
    });
    (handle, rx)
}
