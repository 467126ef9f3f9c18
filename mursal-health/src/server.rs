//! Health check HTTP server

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use mursal_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{HealthChecker, HealthConfig, HealthError};

/// Health check HTTP server providing `/health/live` and `/health/ready`.
pub struct HealthServer {
    listener: TcpListener,
    router: Router,
}

impl HealthServer {
    /// Bind the probe server.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the configured address fails.
    pub async fn new(
        config: HealthConfig,
        health_checker: Arc<HealthChecker>,
    ) -> Result<Self, HealthError> {
        let listener =
            TcpListener::bind(&config.listen_address)
                .await
                .map_err(|e| HealthError::Bind {
                    address: config.listen_address.clone(),
                    source: e,
                })?;

        tracing::info!(
            address = %config.listen_address,
            "Health check server bound"
        );

        let router = Router::new()
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .with_state(health_checker)
            // Probes must answer within a second to be useful.
            .layer(TimeoutLayer::new(Duration::from_secs(1)));

        Ok(Self { listener, router })
    }

    /// Run until shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HealthError> {
        tracing::info!("Health check server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Health check server received shutdown signal");
            })
            .await
            .map_err(|e| HealthError::Server(e.to_string()))?;

        tracing::info!("Health check server stopped");
        Ok(())
    }
}

/// Liveness probe: 200 whenever the process can respond.
async fn liveness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_alive() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

/// Readiness probe: 200 only when every component reports ready.
async fn readiness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        let status = health_checker.get_status();
        tracing::warn!(
            engine_ready = status.engine_ready,
            transport_ready = status.transport_ready,
            sheet_ready = status.sheet_ready,
            queue_depth = status.queue_depth,
            "Readiness probe failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
    }
}
