use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{middleware::from_fn, routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

/// API ingress: owns the HTTP server, the shared middleware stack and the
/// service-level routes (`/health`, `/openapi.json`).
#[derive(Debug, Clone, Default)]
pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    /// Create a new ApiIngress instance with the given configuration
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    /// Wrap module routes with the service routes and the middleware stack.
    pub fn build_router(
        &self,
        api: Router,
        openapi: Option<utoipa::openapi::OpenApi>,
    ) -> Router {
        tracing::debug!("Building router");
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(api)
            .fallback(web::not_found);

        if let Some(doc) = openapi {
            router = router.merge(web::openapi_router(doc));
        }

        // Middleware order (outermost to innermost):
        // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
        // Each `layer` call wraps everything added before it, so they are applied innermost first.
        let x_request_id = crate::request_id::header();

        // 7. Body limit
        router = router.layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));

        // 6. CORS layer (if enabled)
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        // 5. Timeout for handlers
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            self.config.request_timeout_secs,
        )));

        // 4. Trace with request_id/contact_id/status/latency
        router = router.layer(crate::request_id::create_trace_layer());

        // 3. Put request_id into extensions (read by the trace span)
        router = router.layer(from_fn(crate::request_id::push_req_id_to_extensions));

        // 2. Generate x-request-id when missing
        router = router.layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            crate::request_id::MakeReqId,
        ));

        // 1. If client sent x-request-id, propagate it to the response
        router = router.layer(PropagateRequestIdLayer::new(x_request_id));

        router
    }

    /// Bind `addr` and serve `router` until `cancel` fires, then drain in-flight requests.
    pub async fn serve(
        &self,
        router: Router,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        tracing::info!("HTTP server bound on {}", listener.local_addr()?);

        Self::serve_on(listener, router, cancel).await
    }

    /// Serve on an already bound listener (tests bind to port 0).
    pub async fn serve_on(
        listener: tokio::net::TcpListener,
        router: Router,
        cancel: CancellationToken,
    ) -> Result<()> {
        // Graceful shutdown on cancel
        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
