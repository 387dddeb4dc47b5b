//! HTTP listener for the identity server.
//!
//! `ApiIngress` wraps the module routers in the shared middleware stack and runs
//! as a [`modkit::Runnable`]: it binds, serves until its token fires, then gives
//! in-flight requests `shutdown_grace` to finish before the server task is aborted.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use async_trait::async_trait;
use axum::{middleware::from_fn, routing::get, Router};
use modkit::api::request::request_id_header;
use modkit::{Canceled, Runnable};
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

pub struct ApiIngress {
    config: ApiIngressConfig,
    router: Router,
    local_addr: OnceLock<SocketAddr>,
}

impl ApiIngress {
    /// Wrap `routes` with `/health`, the fallback and the middleware stack.
    pub fn new(config: ApiIngressConfig, routes: Router) -> Self {
        let router = build_router(&config, routes);
        Self {
            config,
            router,
            local_addr: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// The finished router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Address actually bound, once `run` has started listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

/// Assemble the HTTP router around the module routes.
pub fn build_router(config: &ApiIngressConfig, routes: Router) -> Router {
    let mut router = routes
        .route("/health", get(web::health_check))
        .fallback(web::not_found);

    // Layers wrap outward, so the last one added sees the request first:
    // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
    router = router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes));
    if config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    if !config.request_timeout.is_zero() {
        router = router.layer(TimeoutLayer::new(config.request_timeout));
    }
    router = router.layer(request_id::create_trace_layer());
    router = router.layer(from_fn(request_id::push_req_id_to_extensions));

    let x_request_id = request_id_header();
    router = router.layer(SetRequestIdLayer::new(
        x_request_id.clone(),
        request_id::MakeReqId,
    ));
    router.layer(PropagateRequestIdLayer::new(x_request_id))
}

#[async_trait]
impl Runnable for ApiIngress {
    fn name(&self) -> &str {
        "api_ingress"
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.config.bind_addr))?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        tracing::info!(%addr, "HTTP server bound");

        let shutdown = {
            let cancel = cancel.clone();
            async move {
                cancel.cancelled().await;
                tracing::info!("HTTP server shutting down gracefully (cancellation)");
            }
        };
        let server = axum::serve(listener, self.router.clone()).with_graceful_shutdown(shutdown);
        let mut task = tokio::spawn(server.into_future());

        tokio::select! {
            res = &mut task => {
                // Server stopped before anyone asked it to.
                return match res {
                    Ok(Ok(())) if cancel.is_cancelled() => Err(Canceled.into()),
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(anyhow::Error::new(e).context("HTTP server failed")),
                    Err(join) => Err(anyhow::anyhow!("HTTP server task failed: {join}")),
                };
            }
            _ = cancel.cancelled() => {}
        }

        let grace = self.config.shutdown_grace;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(Ok(()))) => tracing::info!("HTTP server drained"),
            Ok(Ok(Err(e))) => return Err(anyhow::Error::new(e).context("HTTP server failed")),
            Ok(Err(join)) => return Err(anyhow::anyhow!("HTTP server task failed: {join}")),
            Err(_) => {
                tracing::warn!(?grace, "shutdown grace elapsed, aborting in-flight requests");
                task.abort();
            }
        }
        Err(Canceled.into())
    }
}
