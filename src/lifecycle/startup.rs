//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the cache backend selected in configuration
//! - Register global constraints and the configured route table
//! - Compile the table before any traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: a cache backend that cannot be opened is fatal
//! - Global constraints are registered before routes (they apply either way)

use crate::cache::{build_cache, CacheError};
use crate::config::{CacheBackend, EngineConfig};
use crate::http::ResponseTemplate;
use crate::routing::{RouteOptions, Router, HTTP_METHODS};

/// Build and compile a router serving the configured responses.
pub fn build_router(config: &EngineConfig) -> Result<Router<ResponseTemplate>, CacheError> {
    let mut router = Router::with_config(config.router.clone());
    if let Some(cache) = build_cache(&config.cache)? {
        router = router.with_cache(cache);
    }

    router.where_params(config.constraints.clone());

    for route in &config.routes {
        let template = ResponseTemplate::from_config(&route.response);
        let options = RouteOptions {
            name: route.name.clone(),
            constraints: route.constraints.clone(),
        };

        if route.method.eq_ignore_ascii_case("ANY") {
            // The name is bound to the GET registration only.
            for method in HTTP_METHODS {
                let options = if method == "GET" {
                    options.clone()
                } else {
                    RouteOptions {
                        name: None,
                        ..options.clone()
                    }
                };
                router.add_route(method, route.path.as_str(), template.clone(), options);
            }
        } else {
            router.add_route(route.method.as_str(), route.path.as_str(), template, options);
        }
    }

    let source = router.compile_routes();
    tracing::info!(
        routes = router.routes().len(),
        source = ?source,
        "Router ready"
    );
    Ok(router)
}

/// Build a router for inspection: same routes, no cache backend.
pub fn build_offline_router(config: &EngineConfig) -> Result<Router<ResponseTemplate>, CacheError> {
    let mut config = config.clone();
    config.cache.backend = CacheBackend::None;
    build_router(&config)
}
