//! HTTP server setup and request routing.
//!
//! # Responsibilities
//! - Compile the route table once before accepting traffic
//! - Build an Axum app whose fallback consults the route engine
//! - Invoke matched handlers, answer OPTIONS, map misses to 404/405
//! - Bind server to listener with graceful shutdown
//!
//! # Design Decisions
//! - The router is shared read-only behind an `Arc`; no locking on the hot path
//! - Only the path is routed; query, scheme and host are ignored

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{Method, Uri},
    response::Response,
    Router as AxumRouter,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::http::response::{no_match_response, options_response};
use crate::lifecycle::signals::shutdown_signal;
use crate::routing::{Endpoint, Handler, Router};

/// Build the Axum app serving `router`.
pub fn app<H>(mut router: Router<H>) -> AxumRouter
where
    H: Endpoint<Output = Response> + Send + Sync + 'static,
{
    router.compile_routes();
    AxumRouter::new()
        .fallback(route_request::<H>)
        .with_state(Arc::new(router))
        .layer(TraceLayer::new_for_http())
}

/// Route one request through the engine.
async fn route_request<H>(
    State(router): State<Arc<Router<H>>>,
    method: Method,
    uri: Uri,
) -> Response
where
    H: Endpoint<Output = Response> + Send + Sync + 'static,
{
    let start = Instant::now();
    let path = uri.path();

    let response = match router.match_compiled(method.as_str(), path) {
        Some(found) => {
            let (handler, params) = found.into_parts();
            match handler {
                Handler::Route(endpoint) => endpoint.call(&params),
                Handler::Allow(allow) => options_response(allow.invoke()),
            }
        }
        None => {
            let allowed = router.allowed_methods_compiled(path);
            tracing::debug!(method = %method, path = %path, allowed = allowed.len(), "No route matched");
            no_match_response(&allowed)
        }
    };

    tracing::debug!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Request routed"
    );
    response
}

/// HTTP server for a compiled route table.
pub struct HttpServer {
    app: AxumRouter,
}

impl HttpServer {
    pub fn new<H>(router: Router<H>) -> Self
    where
        H: Endpoint<Output = Response> + Send + Sync + 'static,
    {
        Self { app: app(router) }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
