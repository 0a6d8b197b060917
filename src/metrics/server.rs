use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::MetricsRegistry;
use crate::error::WrapperError;

/// HTTP endpoint exposing a [`MetricsRegistry`] at `/metrics`
pub struct MetricsServer {
    listener: TcpListener,
    registry: Arc<MetricsRegistry>,
}

/// Expand the `:port` shorthand to listen on every interface
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

impl MetricsServer {
    /// Bind the listening socket
    ///
    /// Binding happens up front so the endpoint is reachable before the child
    /// process starts producing output.
    pub async fn bind(addr: &str, registry: Arc<MetricsRegistry>) -> Result<Self, WrapperError> {
        let addr = normalize_addr(addr);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| WrapperError::Metrics(format!("Binding {}: {}", addr, e)))?;

        Ok(Self { listener, registry })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr, WrapperError> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the router serving the registry
    pub fn router(registry: Arc<MetricsRegistry>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(registry)
    }

    /// Serve requests in a background task for the rest of the process
    pub fn spawn(self) -> JoinHandle<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Serving metrics on http://{}/metrics", addr);
        }

        let router = Self::router(self.registry);
        let listener = self.listener;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!("Metrics server failed: {}", e);
            }
        })
    }
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Encoding metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
