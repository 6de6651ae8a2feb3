//! HTTP server implementation

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use kairos_metrics::{Metrics, MetricsSnapshot};
use kairos_scheduler::{IntakeResponse, OperationIntake};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::error::{ApiError, RpcResult};
use crate::types::{parse_userop_request, ScheduledOps, ScheduledQuery};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
    /// Maximum request body size (default: 1MB)
    pub max_body_size: usize,
    /// Enable CORS (default: true)
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_size: 1024 * 1024,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with the given address
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }
}

/// Shared state of the route handlers
pub struct AppState {
    /// Intake for new operations and the sender query
    pub intake: Arc<OperationIntake>,
    /// Metrics exported at `/metrics`
    pub metrics: Arc<Metrics>,
}

/// HTTP server for operation intake and queries
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new server
    pub fn new(config: ServerConfig, intake: Arc<OperationIntake>, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { intake, metrics }),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/ping", get(ping))
            .route("/userop", post(submit_userop))
            .route("/scheduled", get(scheduled))
            .route("/metrics", get(metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestBodyLimitLayer::new(self.config.max_body_size)),
            );

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router.with_state(Arc::clone(&self.state))
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests
    pub async fn run<F>(self, shutdown: F) -> RpcResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get the server listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.listen_addr
    }
}

async fn ping() -> &'static str {
    "pong"
}

async fn submit_userop(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IntakeResponse>, ApiError> {
    let request = parse_userop_request(&body)?;
    tracing::info!(
        sender = %request.userop.sender,
        chain = %request.chain_id,
        "received user operation"
    );
    Ok(Json(state.intake.submit(request).await?))
}

async fn scheduled(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScheduledQuery>,
) -> Result<Json<ScheduledOps>, ApiError> {
    let (sender, chain) = query.parse()?;
    let ops = state.intake.scheduled(&sender, chain).await?;
    Ok(Json(ScheduledOps { ops }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(MetricsSnapshot::from_metrics(&state.metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_server_config_new() {
        let addr: SocketAddr = "127.0.0.1:9545".parse().unwrap();
        let config = ServerConfig::new(addr);
        assert_eq!(config.listen_addr.port(), 9545);
    }
}
