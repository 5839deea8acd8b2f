//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Register routes and constraints
//! - Compile the table lazily (from cache when valid, else from scratch)
//! - Match (method, path) with HEAD and OPTIONS semantics
//! - Report allowed methods for a path
//!
//! # States
//! ```text
//! NotCompiled → Compiled: match_route / compile_routes
//! Compiled → NotCompiled: add_route / where_param / where_params
//! ```
//!
//! # Design Decisions
//! - Mutating and lazily compiling calls take `&mut self`; shared use goes
//!   through `match_compiled` after an explicit `compile_routes`
//! - A cached snapshot is read once, when the cache is attached, and is
//!   consumed by the first compilation
//! - Explicit NoMatch (`None`) rather than an error

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::cache::RouteCache;
use crate::config::schema::{CacheValidation, RouterConfig};
use crate::observability::metrics;
use crate::routing::collection::{RouteCollection, RouteId};
use crate::routing::compiler::{CompiledTable, RouteCompiler};
use crate::routing::error::RouterError;
use crate::routing::params::Params;
use crate::routing::route::Route;
use crate::routing::snapshot::CachedTable;
use crate::routing::HTTP_METHODS;

/// Where the current table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileSource {
    Fresh,
    Cache,
}

impl CompileSource {
    fn as_str(self) -> &'static str {
        match self {
            CompileSource::Fresh => "fresh",
            CompileSource::Cache => "cache",
        }
    }
}

#[derive(Debug)]
enum RouterState {
    NotCompiled,
    Compiled {
        table: CompiledTable,
        source: CompileSource,
    },
}

/// Options applied at registration.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub name: Option<String>,
    /// Per-route constraints; a later global `where_param` overrides them.
    pub constraints: BTreeMap<String, String>,
}

impl RouteOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn constraint(mut self, param: impl Into<String>, regex: impl Into<String>) -> Self {
        self.constraints.insert(param.into(), regex.into());
        self
    }
}

/// Synthetic OPTIONS handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowHandler {
    methods: BTreeSet<String>,
}

impl AllowHandler {
    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    /// Value for the `Allow` header.
    pub fn invoke(&self) -> String {
        self.methods
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Handler selected by a match.
#[derive(Debug)]
pub enum Handler<'r, H> {
    Route(&'r H),
    Allow(AllowHandler),
}

/// Successful match.
#[derive(Debug)]
pub struct RouteMatch<'r, H> {
    handler: Handler<'r, H>,
    params: Params,
    route: Option<&'r Route<H>>,
}

impl<'r, H> RouteMatch<'r, H> {
    pub fn handler(&self) -> &Handler<'r, H> {
        &self.handler
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The matched route; `None` for the synthetic OPTIONS handler.
    pub fn route(&self) -> Option<&'r Route<H>> {
        self.route
    }

    pub fn into_parts(self) -> (Handler<'r, H>, Params) {
        (self.handler, self.params)
    }
}

/// Handler capability required by `dispatch`.
pub trait Endpoint {
    type Output;

    fn call(&self, params: &Params) -> Self::Output;
}

impl<F, O> Endpoint for F
where
    F: Fn(&Params) -> O,
{
    type Output = O;

    fn call(&self, params: &Params) -> O {
        self(params)
    }
}

/// Result of `dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched<O> {
    Handled(O),
    /// OPTIONS answered with an `Allow` value.
    Allow(String),
}

/// HTTP router over handlers of type `H`.
pub struct Router<H> {
    routes: RouteCollection<H>,
    config: RouterConfig,
    cache: Option<Arc<dyn RouteCache>>,
    snapshot: Option<CachedTable>,
    state: RouterState,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::with_config(RouterConfig::default())
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: RouteCollection::new(),
            config,
            cache: None,
            snapshot: None,
            state: RouterState::NotCompiled,
        }
    }

    /// Attach a cache and read its snapshot.
    pub fn with_cache(mut self, cache: Arc<dyn RouteCache>) -> Self {
        self.snapshot = load_snapshot(cache.as_ref(), &self.config.cache_key);
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Registered routes.
    pub fn routes(&self) -> &RouteCollection<H> {
        &self.routes
    }

    /// Register a route.
    pub fn add_route(
        &mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        handler: H,
        options: RouteOptions,
    ) -> RouteId {
        let path = self.normalize_pattern(path.into());
        let route = Route::new(method, path, handler);
        let id = self.routes.add(route, options.name);
        if !options.constraints.is_empty() {
            self.routes.constrain_route(id, options.constraints);
        }
        self.invalidate();
        id
    }

    pub fn add_named_route(
        &mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        handler: H,
        name: impl Into<String>,
        options: RouteOptions,
    ) -> RouteId {
        let options = RouteOptions {
            name: Some(name.into()),
            ..options
        };
        self.add_route(method, path, handler, options)
    }

    pub fn get(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("GET", path, handler, RouteOptions::default())
    }

    pub fn post(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("POST", path, handler, RouteOptions::default())
    }

    pub fn put(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("PUT", path, handler, RouteOptions::default())
    }

    pub fn patch(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("PATCH", path, handler, RouteOptions::default())
    }

    pub fn delete(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("DELETE", path, handler, RouteOptions::default())
    }

    pub fn head(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("HEAD", path, handler, RouteOptions::default())
    }

    pub fn options(&mut self, path: impl Into<String>, handler: H) -> RouteId {
        self.add_route("OPTIONS", path, handler, RouteOptions::default())
    }

    /// Register one handler under every verb.
    pub fn any(&mut self, path: impl Into<String>, handler: H) -> Vec<RouteId>
    where
        H: Clone,
    {
        let path = path.into();
        HTTP_METHODS
            .iter()
            .map(|method| {
                self.add_route(*method, path.clone(), handler.clone(), RouteOptions::default())
            })
            .collect()
    }

    /// Constrain a parameter on every current and future route.
    pub fn where_param(&mut self, param: impl Into<String>, regex: impl Into<String>) {
        self.routes.where_param(param, regex);
        self.invalidate();
    }

    pub fn where_params<I, K, V>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.routes.where_params(constraints);
        self.invalidate();
    }

    pub fn named_route(&self, name: &str) -> Option<&Route<H>> {
        self.routes.get_by_name(name)
    }

    pub fn has_named_route(&self, name: &str) -> bool {
        self.routes.has_name(name)
    }

    /// Reverse routing is not provided.
    pub fn url(&self, _name: &str, _params: &Params) -> Result<String, RouterError> {
        Err(RouterError::Unimplemented("URL generation"))
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, RouterState::Compiled { .. })
    }

    pub fn compile_source(&self) -> Option<CompileSource> {
        match &self.state {
            RouterState::Compiled { source, .. } => Some(*source),
            RouterState::NotCompiled => None,
        }
    }

    /// Handler-free projection of the current table.
    pub fn snapshot(&self) -> Option<CachedTable> {
        match &self.state {
            RouterState::Compiled { table, .. } => Some(CachedTable::from_table(table, &self.routes)),
            RouterState::NotCompiled => None,
        }
    }

    /// Build the routing table now.
    pub fn compile_routes(&mut self) -> CompileSource {
        if let Some(snapshot) = self.snapshot.take() {
            if self.snapshot_is_valid(&snapshot) {
                let table = snapshot.rehydrate(&self.routes);
                return self.install(table, CompileSource::Cache);
            }
            tracing::debug!(
                cached = snapshot.route_count,
                live = self.routes.len(),
                "Cached route table is stale"
            );
        }

        let table = RouteCompiler::compile(&self.routes);
        if let Some(cache) = &self.cache {
            let snapshot = CachedTable::from_table(&table, &self.routes);
            store_snapshot(
                cache.as_ref(),
                &self.config.cache_key,
                &snapshot,
                self.config.cache_ttl(),
            );
        }
        self.install(table, CompileSource::Fresh)
    }

    /// Remove the persisted snapshot.
    pub fn clear_cache(&mut self) -> Result<(), crate::cache::CacheError> {
        self.snapshot = None;
        match &self.cache {
            Some(cache) => cache.delete(&self.config.cache_key),
            None => Ok(()),
        }
    }

    /// Match a request, compiling first if needed.
    pub fn match_route(&mut self, method: &str, uri: &str) -> Option<RouteMatch<'_, H>> {
        self.ensure_compiled();
        self.match_compiled(method, uri)
    }

    /// Match against the already compiled table; `None` when not compiled.
    pub fn match_compiled(&self, method: &str, uri: &str) -> Option<RouteMatch<'_, H>> {
        let RouterState::Compiled { table, .. } = &self.state else {
            tracing::debug!("Match attempted before compilation");
            return None;
        };
        let method = method.to_ascii_uppercase();
        let path = self.normalize_path(uri);

        let found = self.resolve(table, &method, path);
        let outcome = match &found {
            Some(m) if m.route.is_none() => "allow",
            Some(_) => "hit",
            None => "miss",
        };
        metrics::record_match(&method, outcome);
        found
    }

    /// Methods with a route matching `uri`.
    pub fn allowed_methods(&mut self, uri: &str) -> BTreeSet<String> {
        self.ensure_compiled();
        self.allowed_methods_compiled(uri)
    }

    pub fn allowed_methods_compiled(&self, uri: &str) -> BTreeSet<String> {
        match &self.state {
            RouterState::Compiled { table, .. } => self.allowed_in(table, self.normalize_path(uri)),
            RouterState::NotCompiled => BTreeSet::new(),
        }
    }

    fn resolve<'r>(
        &'r self,
        table: &CompiledTable,
        method: &str,
        path: &str,
    ) -> Option<RouteMatch<'r, H>> {
        if method == "HEAD" {
            if let Some(found) = self.lookup(table, "GET", path) {
                return Some(found);
            }
        }

        if method == "OPTIONS" {
            let methods = self.allowed_in(table, path);
            if !methods.is_empty() {
                return Some(RouteMatch {
                    handler: Handler::Allow(AllowHandler { methods }),
                    params: Params::new(),
                    route: None,
                });
            }
        }

        self.lookup(table, method, path)
    }

    fn lookup<'r>(
        &'r self,
        table: &CompiledTable,
        method: &str,
        path: &str,
    ) -> Option<RouteMatch<'r, H>> {
        let (id, params) = table.lookup(&self.routes, method, path)?;
        let route = self.routes.get(id)?;
        Some(RouteMatch {
            handler: Handler::Route(route.handler()),
            params,
            route: Some(route),
        })
    }

    fn allowed_in(&self, table: &CompiledTable, path: &str) -> BTreeSet<String> {
        table
            .methods()
            .filter(|method| table.lookup(&self.routes, method, path).is_some())
            .map(str::to_string)
            .collect()
    }

    fn ensure_compiled(&mut self) {
        if !self.is_compiled() {
            self.compile_routes();
        }
    }

    fn install(&mut self, table: CompiledTable, source: CompileSource) -> CompileSource {
        tracing::info!(
            routes = self.routes.len(),
            source = source.as_str(),
            "Route table compiled"
        );
        metrics::record_compilation(source.as_str(), self.routes.len());
        self.state = RouterState::Compiled { table, source };
        source
    }

    fn invalidate(&mut self) {
        self.state = RouterState::NotCompiled;
    }

    fn snapshot_is_valid(&self, snapshot: &CachedTable) -> bool {
        match self.config.cache_validation {
            CacheValidation::RouteCount => snapshot.route_count == self.routes.len(),
            CacheValidation::Fingerprint => {
                snapshot.route_count == self.routes.len()
                    && snapshot.fingerprint == Some(self.routes.fingerprint())
            }
        }
    }

    fn normalize_path<'a>(&self, uri: &'a str) -> &'a str {
        if self.config.strip_trailing_slash && uri.len() > 1 && uri.ends_with('/') {
            &uri[..uri.len() - 1]
        } else {
            uri
        }
    }

    fn normalize_pattern(&self, path: String) -> String {
        if self.config.strip_trailing_slash && path.len() > 1 && path.ends_with('/') {
            path[..path.len() - 1].to_string()
        } else {
            path
        }
    }
}

impl<H: Endpoint> Router<H> {
    /// Match and invoke in one step.
    pub fn dispatch(&mut self, method: &str, uri: &str) -> Result<Dispatched<H::Output>, RouterError> {
        let Some(found) = self.match_route(method, uri) else {
            tracing::debug!(method = %method, path = %uri, "No route matched");
            return Err(RouterError::NotFound {
                method: method.to_ascii_uppercase(),
                path: uri.to_string(),
            });
        };
        let (handler, params) = found.into_parts();
        Ok(match handler {
            Handler::Route(endpoint) => Dispatched::Handled(endpoint.call(&params)),
            Handler::Allow(allow) => Dispatched::Allow(allow.invoke()),
        })
    }
}

fn load_snapshot(cache: &dyn RouteCache, key: &str) -> Option<CachedTable> {
    let text = match cache.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read route cache");
            metrics::record_cache_error("get");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding unreadable route cache");
            metrics::record_cache_error("decode");
            None
        }
    }
}

fn store_snapshot(
    cache: &dyn RouteCache,
    key: &str,
    snapshot: &CachedTable,
    ttl: Option<std::time::Duration>,
) {
    let text = match serde_json::to_string(snapshot) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to encode route table");
            metrics::record_cache_error("encode");
            return;
        }
    };
    if let Err(e) = cache.set(key, text, ttl) {
        tracing::warn!(key = %key, error = %e, "Failed to write route cache");
        metrics::record_cache_error("set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn handler_of<'r>(found: &RouteMatch<'r, &'static str>) -> &'static str {
        match found.handler() {
            Handler::Route(h) => **h,
            Handler::Allow(_) => panic!("expected a route handler"),
        }
    }

    #[test]
    fn test_static_and_trailing_slash() {
        let mut router = Router::new();
        router.get("/about", "about");
        router.get("/", "home");

        assert_eq!(handler_of(&router.match_route("GET", "/about").unwrap()), "about");
        assert_eq!(handler_of(&router.match_route("GET", "/about/").unwrap()), "about");
        assert_eq!(handler_of(&router.match_route("get", "/").unwrap()), "home");
        assert!(router.match_route("GET", "/about//").is_none());
    }

    #[test]
    fn test_registered_trailing_slash_is_normalized() {
        let mut router = Router::new();
        router.get("/docs/", "docs");
        assert_eq!(handler_of(&router.match_route("GET", "/docs").unwrap()), "docs");
        assert_eq!(handler_of(&router.match_route("GET", "/docs/").unwrap()), "docs");
    }

    #[test]
    fn test_state_transitions() {
        let mut router = Router::new();
        router.get("/a", "a");
        assert!(!router.is_compiled());
        router.match_route("GET", "/a");
        assert_eq!(router.compile_source(), Some(CompileSource::Fresh));

        router.get("/b", "b");
        assert!(!router.is_compiled());
        assert!(router.match_route("GET", "/b").is_some());

        router.where_param("id", r"\d+");
        assert!(!router.is_compiled());
        assert!(router.match_compiled("GET", "/a").is_none());
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut router = Router::new();
        router.get("/x", "get-x");
        router.head("/y", "head-y");

        assert_eq!(handler_of(&router.match_route("HEAD", "/x").unwrap()), "get-x");
        assert_eq!(handler_of(&router.match_route("HEAD", "/y").unwrap()), "head-y");
        assert!(router.match_route("HEAD", "/z").is_none());
    }

    #[test]
    fn test_options_returns_allow_handler() {
        let mut router = Router::new();
        router.get("/x", "get-x");
        router.post("/x", "post-x");
        router.delete("/items/{id}", "del");

        let found = router.match_route("OPTIONS", "/x").unwrap();
        assert!(found.route().is_none());
        match found.handler() {
            Handler::Allow(allow) => assert_eq!(allow.invoke(), "GET, POST"),
            Handler::Route(_) => panic!("expected allow handler"),
        }

        let found = router.match_route("OPTIONS", "/items/3").unwrap();
        assert!(matches!(found.handler(), Handler::Allow(a) if a.invoke() == "DELETE"));
        assert!(router.match_route("OPTIONS", "/nowhere").is_none());
    }

    #[test]
    fn test_allowed_methods() {
        let mut router = Router::new();
        router.get("/users/{id}", "show");
        router.put("/users/{id}", "update");
        router.post("/users", "create");

        let allowed: Vec<_> = router.allowed_methods("/users/1").into_iter().collect();
        assert_eq!(allowed, vec!["GET", "PUT"]);
        assert!(router.allowed_methods("/nothing").is_empty());
    }

    #[test]
    fn test_any_registers_every_verb() {
        let mut router = Router::new();
        let ids = router.any("/ping", "ping");
        assert_eq!(ids.len(), HTTP_METHODS.len());
        for method in HTTP_METHODS {
            if method == "OPTIONS" {
                continue;
            }
            assert_eq!(handler_of(&router.match_route(method, "/ping").unwrap()), "ping");
        }
    }

    #[test]
    fn test_named_routes() {
        let mut router = Router::new();
        router.add_named_route("GET", "/users/{id}", "show", "users.show", RouteOptions::default());
        assert!(router.has_named_route("users.show"));
        assert_eq!(router.named_route("users.show").unwrap().path(), "/users/{id}");
        assert!(!router.has_named_route("missing"));
        assert_eq!(
            router.url("users.show", &Params::new()),
            Err(RouterError::Unimplemented("URL generation"))
        );
    }

    #[test]
    fn test_route_options_constraints() {
        let mut router = Router::new();
        router.add_route(
            "GET",
            "/orders/{id}",
            "order",
            RouteOptions::named("orders.show").constraint("id", r"\d+"),
        );
        assert!(router.match_route("GET", "/orders/12").is_some());
        assert!(router.match_route("GET", "/orders/ab").is_none());

        router.where_param("id", "[a-z]+");
        assert!(router.match_route("GET", "/orders/ab").is_some());
    }

    #[test]
    fn test_dispatch() {
        let mut router: Router<fn(&Params) -> String> = Router::new();
        router.get("/hello/{name}", |p: &Params| format!("hi {}", p.get("name").unwrap_or("")));

        assert_eq!(
            router.dispatch("GET", "/hello/ann"),
            Ok(Dispatched::Handled("hi ann".to_string()))
        );
        assert_eq!(router.dispatch("OPTIONS", "/hello/ann"), Ok(Dispatched::Allow("GET".into())));

        let err = router.dispatch("GET", "/bye").unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(
            err,
            RouterError::NotFound {
                method: "GET".into(),
                path: "/bye".into()
            }
        );
    }

    #[test]
    fn test_cache_written_and_reused() {
        let cache = MemoryCache::new();

        let mut first = Router::new().with_cache(Arc::new(cache.clone()));
        first.get("/users/{id}", "show");
        first.get("/users/{id}/edit", "edit");
        assert_eq!(first.compile_routes(), CompileSource::Fresh);
        assert!(cache.has(crate::config::schema::DEFAULT_CACHE_KEY).unwrap());

        let mut second = Router::new().with_cache(Arc::new(cache.clone()));
        second.get("/users/{id}", "show");
        second.get("/users/{id}/edit", "edit");
        let found = second.match_route("GET", "/users/3/edit").unwrap();
        assert_eq!(handler_of(&found), "edit");
        assert_eq!(found.params().get("id"), Some("3"));
        assert_eq!(second.compile_source(), Some(CompileSource::Cache));
    }

    #[test]
    fn test_stale_cache_is_replaced() {
        let cache = MemoryCache::new();
        let mut first = Router::new().with_cache(Arc::new(cache.clone()));
        first.get("/a/{x}", "a");
        first.compile_routes();

        let mut second = Router::new().with_cache(Arc::new(cache.clone()));
        second.get("/a/{x}", "a");
        second.get("/b/{x}", "b");
        assert_eq!(second.compile_routes(), CompileSource::Fresh);
        assert_eq!(handler_of(&second.match_route("GET", "/b/1").unwrap()), "b");
    }

    #[test]
    fn test_fingerprint_validation_rejects_same_size_table() {
        let cache = MemoryCache::new();
        let config = RouterConfig {
            cache_validation: CacheValidation::Fingerprint,
            ..RouterConfig::default()
        };

        let mut first = Router::with_config(config.clone()).with_cache(Arc::new(cache.clone()));
        first.get("/a/{x}", "a");
        first.compile_routes();

        let mut second = Router::with_config(config).with_cache(Arc::new(cache.clone()));
        second.get("/b/{x}", "b");
        assert_eq!(second.compile_routes(), CompileSource::Fresh);
        assert_eq!(handler_of(&second.match_route("GET", "/b/1").unwrap()), "b");
    }

    #[test]
    fn test_count_validation_drops_unknown_entries() {
        let cache = MemoryCache::new();
        let mut first = Router::new().with_cache(Arc::new(cache.clone()));
        first.get("/a/{x}", "a");
        first.compile_routes();

        let mut second = Router::new().with_cache(Arc::new(cache.clone()));
        second.get("/b/{x}", "b");
        assert_eq!(second.compile_routes(), CompileSource::Cache);
        assert!(second.match_route("GET", "/b/1").is_none());

        second.get("/c", "c");
        assert_eq!(second.compile_routes(), CompileSource::Fresh);
        assert!(second.match_route("GET", "/b/1").is_some());
    }

    #[test]
    fn test_clear_cache() {
        let cache = MemoryCache::new();
        let mut router: Router<&str> = Router::new().with_cache(Arc::new(cache.clone()));
        router.get("/a", "a");
        router.compile_routes();
        router.clear_cache().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut router = Router::new();
        router.get("/", "home");
        router.get("/users/{id}", "show");
        router.get("/users/{id}/posts/{post}", "post");
        router.get("/{lang}/about", "about");

        router.compile_routes();
        let first = router.snapshot().unwrap();
        router.compile_routes();
        assert_eq!(router.snapshot().unwrap(), first);
    }
}
