//! Web server for filevault.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileStorage;
use crate::store::Storage;
use crate::{Result, VaultError};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_app;

/// Interval between refresh token cleanups.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    config: Config,
}

impl WebServer {
    /// Create a server over the given metadata backend.
    ///
    /// The blob directory from `files.storage_path` is created if needed.
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port)
            .parse()
            .map_err(|e| VaultError::Config(format!("invalid web server address: {e}")))?;

        let blobs = FileStorage::new(&config.files.storage_path)?;
        tracing::info!("File storage initialized at: {}", config.files.storage_path);

        let app_state = AppState::from_config(config, storage, blobs);
        let rate_limits = Arc::new(RateLimitState::new(
            config.web.login_rate_limit,
            config.web.api_rate_limit,
        ));

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            rate_limits,
            config: config.clone(),
        })
    }

    /// Remove expired and revoked refresh tokens every hour.
    fn start_token_cleanup_task(storage: Arc<dyn Storage>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match storage.cleanup_refresh_tokens().await {
                    Ok(0) => tracing::debug!("No expired refresh tokens to clean up"),
                    Ok(count) => tracing::info!(
                        deleted_count = count,
                        "Cleaned up expired/revoked refresh tokens"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup refresh tokens"),
                }
            }
        });
    }

    /// Bind the listener, start background tasks and build the app.
    async fn prepare(self) -> Result<(TcpListener, Router)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_token_cleanup_task(self.app_state.storage.clone());
        self.rate_limits.clone().start_cleanup_task();
        tracing::info!("Token cleanup task started (runs every hour)");

        let router = create_app(self.app_state, self.rate_limits, &self.config.web);

        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, router))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<()> {
        let (listener, router) = self.prepare().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Bind to port 0 in tests to get a free port.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router) = self.prepare().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStorage;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn create_test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.web.host = "127.0.0.1".to_string();
        config.web.port = 0;
        config.web.jwt_secret = "test-secret-key".to_string();
        config.files.storage_path = dir.path().join("uploads").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let dir = TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(&dir), Arc::new(MemStorage::new())).unwrap();

        assert_eq!(server.addr.ip().to_string(), "127.0.0.1");
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_web_server_invalid_addr() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir);
        config.web.host = "not an address".to_string();

        let result = WebServer::new(&config, Arc::new(MemStorage::new()));
        assert!(matches!(result, Err(VaultError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let dir = TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(&dir), Arc::new(MemStorage::new())).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
    }
}
