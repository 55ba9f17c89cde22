//! Status HTTP server.
//!
//! `GET /_status/healthz` answers `OK` while the process is up;
//! `GET /_status/version` returns the package version.

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub fn router() -> Router {
    Router::new()
        .route("/_status/healthz", get(healthz))
        .route("/_status/version", get(version))
}

async fn healthz() -> &'static str {
    "OK"
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    debug!("status server stopped");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use super::serve;

    async fn start() -> (String, CancellationToken, tokio::task::JoinHandle<std::io::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, shutdown.clone()));
        (base, shutdown, handle)
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let (base, shutdown, handle) = start().await;

        let resp = reqwest::get(format!("{base}/_status/healthz")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "OK");

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn version_reports_package_version() {
        let (base, shutdown, handle) = start().await;

        let body = reqwest::get(format!("{base}/_status/version"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, env!("CARGO_PKG_VERSION"));

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (base, shutdown, handle) = start().await;

        let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(resp.status(), 404);
        drop(resp);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
