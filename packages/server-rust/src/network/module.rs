//! Network module with deferred startup lifecycle.
//!
//! `new()` wires the routes, `start()` binds the TCP listener, and `serve()`
//! accepts connections until the shutdown future resolves. Binding before
//! serving lets the caller log the real port (port 0 picks an ephemeral one).

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, readiness_handler, xmlrpc_handler, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownCoordinator;
use crate::service::RemoteLibraryService;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- captures the dispatcher and shutdown coordinator
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- answers requests until the shutdown future resolves
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    service: RemoteLibraryService,
    shutdown: Arc<ShutdownCoordinator>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        service: RemoteLibraryService,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            config,
            listener: None,
            service,
            shutdown,
        }
    }

    /// Returns a shared reference to the shutdown coordinator.
    #[must_use]
    pub fn shutdown_coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- health JSON
    /// - `GET /health/ready` -- readiness probe
    /// - `POST /` and `POST /{*path}` -- XML-RPC endpoint
    ///
    /// XML-RPC requests are processed one at a time.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        };

        let rpc = Router::new()
            .route("/", post(xmlrpc_handler))
            .route("/{*path}", post(xmlrpc_handler))
            .route_layer(GlobalConcurrencyLimitLayer::new(1));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(rpc)
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// Health moves to `Ready` before the first request is accepted and to
    /// `Stopped` once the listener has closed. A remote shutdown request
    /// does not go through this future; it ends the process directly.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        self.shutdown.set_ready();
        info!("Serving XML-RPC requests");

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.shutdown.set_stopped();
        result?;
        Ok(())
    }
}
