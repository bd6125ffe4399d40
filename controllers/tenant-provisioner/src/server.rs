//! HTTP server lifecycle.
//!
//! Serves the router until a shutdown signal arrives, then drains in-flight
//! requests for at most `SHUTDOWN_GRACE` before returning.

use crate::error::ProvisionerError;
use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Upper bound on draining open connections after a shutdown signal
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Serve `app` on `listener` until `signal` resolves.
///
/// Requests still running `grace` after the signal are abandoned.
pub async fn serve<S>(
    listener: TcpListener,
    app: Router,
    signal: S,
    grace: Duration,
) -> Result<(), ProvisionerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());
    let notify = Arc::clone(&draining);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            notify.notify_one();
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        () = draining.notified() => {
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(?grace, "Shutdown grace period elapsed, dropping open connections"),
            }
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn stalled() -> &'static str {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        "late"
    }

    async fn spawn_server(
        grace: Duration,
    ) -> (std::net::SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<(), ProvisionerError>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = Router::new().route("/stalled", get(stalled));
        let signal = async move {
            let _ = stop_rx.await;
        };
        let handle = tokio::spawn(serve(listener, app, signal, grace));
        (addr, stop_tx, handle)
    }

    #[tokio::test]
    async fn test_idle_server_stops_on_signal() {
        let (_, stop, handle) = spawn_server(Duration::from_secs(30)).await;
        stop.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server should stop promptly");
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_drain_is_bounded_by_grace_period() {
        let (addr, stop, handle) = spawn_server(Duration::from_millis(200)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /stalled HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        // Let the request reach the handler
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("drain should give up after the grace period");
        assert!(result.unwrap().is_ok());
        drop(stream);
    }
}
