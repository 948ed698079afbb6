use std::future::{Future, IntoFuture};
use std::io;
use std::time::Duration;

use axum::{serve, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::state::StampStore;

/// Serve `app` until `shutdown` resolves, then drain.
///
/// When `shutdown` fires the store stops accepting writes and the listener
/// closes. In-flight requests get `grace` to finish; whatever is still
/// running after that is abandoned and this returns so the caller can
/// persist the store.
pub async fn run<F>(
    listener: TcpListener,
    app: Router,
    store: StampStore,
    grace: Duration,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (draining_tx, mut draining_rx) = watch::channel(false);

    let server = serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            store.stop_accepting();
            tracing::warn!("Shutdown requested, draining in-flight requests");
            let _ = draining_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        biased;
        res = &mut server => return res,
        _ = draining_rx.changed() => {}
    }

    match tokio::time::timeout(grace, server).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                "Requests still running after {}s grace period, abandoning them",
                grace.as_secs()
            );
            Ok(())
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
