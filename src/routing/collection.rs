//! Ordered route registry.
//!
//! # Responsibilities
//! - Keep routes in registration order
//! - Index routes by method, by name, and by (method, pattern)
//! - Hold global parameter constraints and apply them to current and future routes
//! - Provide the linear reference matcher
//!
//! # Design Decisions
//! - Routes are addressed by `RouteId` (registration index); there is no removal
//! - Re-adding a name rebinds it to the newer route
//! - Duplicate static (method, path) pairs: the later route wins the exact lookup

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::routing::params::Params;
use crate::routing::route::Route;

/// Registration index of a route within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) usize);

impl RouteId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Registry of routes with retroactive global constraints.
#[derive(Debug, Clone)]
pub struct RouteCollection<H> {
    routes: Vec<Route<H>>,
    by_method: HashMap<String, Vec<RouteId>>,
    static_index: HashMap<String, HashMap<String, RouteId>>,
    by_pattern: HashMap<(String, String), Vec<RouteId>>,
    names: HashMap<String, RouteId>,
    constraints: BTreeMap<String, String>,
}

impl<H> Default for RouteCollection<H> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            by_method: HashMap::new(),
            static_index: HashMap::new(),
            by_pattern: HashMap::new(),
            names: HashMap::new(),
            constraints: BTreeMap::new(),
        }
    }
}

impl<H> RouteCollection<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route, optionally binding a name.
    pub fn add(&mut self, mut route: Route<H>, name: Option<String>) -> RouteId {
        let id = RouteId(self.routes.len());

        let applicable: Vec<(String, String)> = self
            .constraints
            .iter()
            .filter(|(param, _)| route.has_parameter(param))
            .map(|(param, regex)| (param.clone(), regex.clone()))
            .collect();
        if !applicable.is_empty() {
            route.where_params(applicable);
        }

        if let Some(name) = &name {
            if let Some(previous) = self.names.insert(name.clone(), id) {
                tracing::debug!(name = %name, previous = previous.0, "Route name rebound");
                self.routes[previous.0].set_name(None);
            }
        }
        route.set_name(name);

        let method = route.method().to_string();
        self.by_method.entry(method.clone()).or_default().push(id);
        if route.is_static() {
            self.static_index
                .entry(method.clone())
                .or_default()
                .insert(route.path().to_string(), id);
        }
        self.by_pattern
            .entry((method, route.path().to_string()))
            .or_default()
            .push(id);

        self.routes.push(route);
        id
    }

    /// Register a global constraint and apply it to every route using `param`.
    pub fn where_param(&mut self, param: impl Into<String>, regex: impl Into<String>) {
        let param = param.into();
        let regex = regex.into();
        let mut touched = 0usize;
        for route in self.routes.iter_mut().filter(|r| r.has_parameter(&param)) {
            route.where_param(param.clone(), regex.clone());
            touched += 1;
        }
        tracing::debug!(param = %param, routes = touched, "Global constraint applied");
        self.constraints.insert(param, regex);
    }

    /// Register several global constraints.
    pub fn where_params<I, K, V>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (param, regex) in constraints {
            self.where_param(param, regex);
        }
    }

    /// Apply constraints to one route only.
    pub fn constrain_route<I, K, V>(&mut self, id: RouteId, constraints: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let Some(route) = self.routes.get_mut(id.0) {
            route.where_params(constraints);
        }
    }

    /// Global constraints registered so far.
    pub fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    pub fn get(&self, id: RouteId) -> Option<&Route<H>> {
        self.routes.get(id.0)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Route<H>> {
        self.names.get(name).and_then(|id| self.get(*id))
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Routes registered under (method, pattern), in registration order.
    pub fn find(&self, method: &str, pattern: &str) -> &[RouteId] {
        self.by_pattern
            .get(&(method.to_string(), pattern.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Route ids registered for one method, in registration order.
    pub fn routes_for(&self, method: &str) -> &[RouteId] {
        self.by_method.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Methods with at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.by_method.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouteId, &Route<H>)> {
        self.routes.iter().enumerate().map(|(i, r)| (RouteId(i), r))
    }

    /// Hash over method, pattern and constraints of every route, in order.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for route in &self.routes {
            route.method().hash(&mut hasher);
            route.path().hash(&mut hasher);
            route.constraints().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Reference matcher: exact lookup, then a linear scan of the method's
    /// dynamic routes in registration order.
    pub fn match_route(&self, method: &str, path: &str) -> Option<(RouteId, Params)> {
        if let Some(id) = self.static_index.get(method).and_then(|m| m.get(path)) {
            return Some((*id, Params::new()));
        }
        self.routes_for(method)
            .iter()
            .filter_map(|id| self.get(*id).map(|route| (*id, route)))
            .filter(|(_, route)| !route.is_static())
            .find_map(|(id, route)| route.matches(path).map(|params| (id, params)))
    }
}
