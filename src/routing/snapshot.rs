//! Handler-free projection of a compiled table.
//!
//! # Data Flow
//! ```text
//! CompiledTable + RouteCollection
//!     → CachedTable (patterns, parameter names, constraints)
//!     → serde_json → cache backend
//!
//! cache backend → CachedTable
//!     → rehydrate against the live RouteCollection
//!       ((method, pattern) lookup, unmatched entries dropped)
//!     → CompiledTable
//! ```
//!
//! # Design Decisions
//! - Handlers never cross the serialization boundary
//! - Maps are ordered so two snapshots of the same table compare equal
//! - A combined group with a missing or changed member is rebuilt from the
//!   live routes that were found

use std::collections::{BTreeMap, HashMap};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::routing::collection::{RouteCollection, RouteId};
use crate::routing::compiler::{self, CompiledTable, Group, GroupMember, MethodGroups};
use crate::routing::route::Route;

/// One route as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRoute {
    /// The path pattern the route was registered with.
    pub pattern: String,
    pub parameters: Vec<String>,
    pub param_constraints: BTreeMap<String, String>,
}

impl CachedRoute {
    fn from_route<H>(route: &Route<H>) -> Self {
        Self {
            pattern: route.path().to_string(),
            parameters: route.parameter_names().to_vec(),
            param_constraints: route.constraints().clone(),
        }
    }
}

/// One dynamic group as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CachedGroup {
    Single {
        pattern: String,
        route: CachedRoute,
    },
    Group {
        pattern: String,
        #[serde(rename = "routeMap", deserialize_with = "index_keys")]
        route_map: BTreeMap<usize, CachedRoute>,
    },
}

/// `routeMap` keys are JSON strings; the tagged enum buffers them as such.
fn index_keys<'de, D>(deserializer: D) -> Result<BTreeMap<usize, CachedRoute>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, CachedRoute>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, route)| {
            key.parse::<usize>()
                .map(|index| (index, route))
                .map_err(|_| de::Error::custom(format!("invalid route index '{}'", key)))
        })
        .collect()
}

/// Persisted routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTable {
    pub route_count: usize,
    #[serde(default)]
    pub fingerprint: Option<u64>,
    #[serde(rename = "static")]
    pub statics: BTreeMap<String, BTreeMap<String, CachedRoute>>,
    pub dynamic: BTreeMap<String, BTreeMap<String, CachedGroup>>,
}

impl CachedTable {
    /// Project a compiled table, dropping handlers.
    pub fn from_table<H>(table: &CompiledTable, routes: &RouteCollection<H>) -> Self {
        let statics = table
            .statics
            .iter()
            .map(|(method, paths)| {
                let entries = paths
                    .iter()
                    .filter_map(|(path, id)| {
                        routes
                            .get(*id)
                            .map(|route| (path.clone(), CachedRoute::from_route(route)))
                    })
                    .collect();
                (method.clone(), entries)
            })
            .collect();

        let dynamic = table
            .dynamic
            .iter()
            .map(|(method, groups)| {
                let entries = groups
                    .iter()
                    .filter_map(|(key, group)| {
                        project_group(group, routes).map(|g| (key.to_string(), g))
                    })
                    .collect();
                (method.clone(), entries)
            })
            .collect();

        Self {
            route_count: routes.len(),
            fingerprint: Some(routes.fingerprint()),
            statics,
            dynamic,
        }
    }

    /// Rebuild a compiled table by binding cached entries to live routes.
    pub fn rehydrate<H>(&self, routes: &RouteCollection<H>) -> CompiledTable {
        let mut dropped = 0usize;

        let mut statics: HashMap<String, HashMap<String, RouteId>> = HashMap::new();
        for (method, paths) in &self.statics {
            for (path, cached) in paths {
                match routes.find(method, &cached.pattern).last() {
                    Some(id) => {
                        statics
                            .entry(method.clone())
                            .or_default()
                            .insert(path.clone(), *id);
                    }
                    None => dropped += 1,
                }
            }
        }

        let mut dynamic = HashMap::new();
        for (method, groups) in &self.dynamic {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            let mut rebuilt = Vec::with_capacity(groups.len());
            for (key, cached) in groups {
                let group = match cached {
                    CachedGroup::Single { pattern, route } => {
                        match bind(routes, method, route, &mut seen) {
                            Some(id) => Some(Group::Single {
                                route: id,
                                pattern: pattern.clone(),
                            }),
                            None => {
                                dropped += 1;
                                None
                            }
                        }
                    }
                    CachedGroup::Group { pattern, route_map } => {
                        let mut ids = Vec::with_capacity(route_map.len());
                        let mut members = Vec::with_capacity(route_map.len());
                        for (index, cached_route) in route_map {
                            match bind(routes, method, cached_route, &mut seen) {
                                Some(id) => {
                                    ids.push(id);
                                    members.push(GroupMember::new(
                                        *index,
                                        id,
                                        cached_route.parameters.len(),
                                    ));
                                }
                                None => dropped += 1,
                            }
                        }
                        if ids.len() == route_map.len() {
                            Some(Group::Combined {
                                pattern: pattern.clone(),
                                regex: compiler::compile_combined(pattern),
                                members,
                            })
                        } else {
                            compiler::build_group(routes, &ids)
                        }
                    }
                };
                if let Some(group) = group {
                    rebuilt.push((key.clone(), group));
                }
            }
            dynamic.insert(method.clone(), MethodGroups::from_groups(rebuilt));
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Cached route entries without a live route were dropped");
        }

        CompiledTable { statics, dynamic }
    }
}

/// Bind a cached dynamic entry to the next unclaimed live route with the
/// same (method, pattern). Parameters must still line up.
fn bind<'a, H>(
    routes: &RouteCollection<H>,
    method: &str,
    cached: &'a CachedRoute,
    seen: &mut HashMap<&'a str, usize>,
) -> Option<RouteId> {
    let occurrence = seen.entry(cached.pattern.as_str()).or_insert(0);
    let id = *routes.find(method, &cached.pattern).get(*occurrence)?;
    *occurrence += 1;
    let route = routes.get(id)?;
    (route.parameter_names() == cached.parameters.as_slice()).then_some(id)
}

fn project_group<H>(group: &Group, routes: &RouteCollection<H>) -> Option<CachedGroup> {
    match group {
        Group::Single { route, pattern } => Some(CachedGroup::Single {
            pattern: pattern.clone(),
            route: CachedRoute::from_route(routes.get(*route)?),
        }),
        Group::Combined {
            pattern, members, ..
        } => {
            let route_map = members
                .iter()
                .filter_map(|m| {
                    routes
                        .get(m.route)
                        .map(|route| (m.index, CachedRoute::from_route(route)))
                })
                .collect();
            Some(CachedGroup::Group {
                pattern: pattern.clone(),
                route_map,
            })
        }
    }
}
