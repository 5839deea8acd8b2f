//! Route table compilation.
//!
//! # Data Flow
//! ```text
//! RouteCollection
//!     → partition by method and static/dynamic
//!     → static: method → path → RouteId
//!     → dynamic: method → first segment → Group
//!         single route  → the route's own pattern
//!         several routes → one alternation, one named group per member
//! ```
//!
//! # Design Decisions
//! - Pure transform: the collection is not modified
//! - A route whose first segment holds a placeholder goes to `__dynamic__`
//! - Alternation is leftmost-first, so the earliest registered member wins
//! - A combined pattern that does not compile degrades to a per-member scan

use std::collections::HashMap;

use regex::Regex;

use crate::routing::collection::{RouteCollection, RouteId};
use crate::routing::params::Params;
use crate::routing::pattern;

/// Group key for routes whose first segment is not literal.
pub const DYNAMIC_BUCKET: &str = "__dynamic__";

/// Member of a combined group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub index: usize,
    pub route: RouteId,
    capture: String,
    param_groups: Vec<String>,
}

impl GroupMember {
    pub(crate) fn new(index: usize, route: RouteId, param_count: usize) -> Self {
        Self {
            index,
            route,
            capture: member_group(index),
            param_groups: (0..param_count).map(|k| member_param_group(index, k)).collect(),
        }
    }
}

/// Dynamic routes sharing a first segment.
#[derive(Debug, Clone)]
pub enum Group {
    Single {
        route: RouteId,
        pattern: String,
    },
    Combined {
        pattern: String,
        regex: Option<Regex>,
        members: Vec<GroupMember>,
    },
}

impl Group {
    /// Pattern text stored for this group.
    pub fn pattern(&self) -> &str {
        match self {
            Group::Single { pattern, .. } | Group::Combined { pattern, .. } => pattern,
        }
    }

    /// Routes in the group, in registration order.
    pub fn routes(&self) -> Vec<RouteId> {
        match self {
            Group::Single { route, .. } => vec![*route],
            Group::Combined { members, .. } => members.iter().map(|m| m.route).collect(),
        }
    }

    /// Earliest registered route of the group.
    pub fn first_route(&self) -> Option<RouteId> {
        match self {
            Group::Single { route, .. } => Some(*route),
            Group::Combined { members, .. } => members.iter().map(|m| m.route).min(),
        }
    }

    /// Match a path against the group; the earliest registered member wins.
    pub fn match_path<H>(
        &self,
        routes: &RouteCollection<H>,
        path: &str,
    ) -> Option<(RouteId, Params)> {
        match self {
            Group::Single { route, .. } => {
                let params = routes.get(*route)?.matches(path)?;
                Some((*route, params))
            }
            Group::Combined {
                regex: Some(regex),
                members,
                ..
            } => {
                let captures = regex.captures(path)?;
                let member = members
                    .iter()
                    .find(|m| captures.name(&m.capture).is_some())?;
                let route = routes.get(member.route)?;
                let mut params = Params::new();
                for (name, group) in route.parameter_names().iter().zip(&member.param_groups) {
                    if let Some(value) = captures.name(group) {
                        params.insert(name.as_str(), value.as_str());
                    }
                }
                Some((member.route, params))
            }
            Group::Combined {
                regex: None,
                members,
                ..
            } => members.iter().find_map(|m| {
                routes
                    .get(m.route)?
                    .matches(path)
                    .map(|params| (m.route, params))
            }),
        }
    }
}

/// Groups of one method, kept in order of first registration.
#[derive(Debug, Clone, Default)]
pub struct MethodGroups {
    keys: HashMap<String, usize>,
    groups: Vec<(String, Group)>,
}

impl MethodGroups {
    pub fn get(&self, key: &str) -> Option<&Group> {
        self.keys.get(key).map(|i| &self.groups[*i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(k, g)| (k.as_str(), g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Build from groups in any order; they are sorted by first route.
    pub(crate) fn from_groups(mut groups: Vec<(String, Group)>) -> Self {
        groups.sort_by_key(|(_, g)| g.first_route());
        let keys = groups
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();
        Self { keys, groups }
    }

    /// Match a path: its first-segment group and the `__dynamic__` bucket,
    /// then every other group. The earliest registered match wins.
    pub fn match_path<H>(
        &self,
        routes: &RouteCollection<H>,
        path: &str,
    ) -> Option<(RouteId, Params)> {
        let segment = pattern::first_segment(path);

        let literal = self.get(segment).filter(|_| segment != DYNAMIC_BUCKET);
        let bucket = self.get(DYNAMIC_BUCKET);
        let mut found = literal.and_then(|g| g.match_path(routes, path));

        if let Some(bucket) = bucket {
            let may_win = match (&found, bucket.first_route()) {
                (Some((winner, _)), Some(first)) => first < *winner,
                _ => true,
            };
            if may_win {
                if let Some(candidate) = bucket.match_path(routes, path) {
                    let better = match &found {
                        Some((winner, _)) => candidate.0 < *winner,
                        None => true,
                    };
                    if better {
                        found = Some(candidate);
                    }
                }
            }
        }

        if found.is_some() {
            return found;
        }

        self.groups
            .iter()
            .filter(|(key, _)| key != segment && key != DYNAMIC_BUCKET)
            .find_map(|(_, group)| group.match_path(routes, path))
    }
}

/// Compiled routing table.
#[derive(Debug, Clone, Default)]
pub struct CompiledTable {
    pub(crate) statics: HashMap<String, HashMap<String, RouteId>>,
    pub(crate) dynamic: HashMap<String, MethodGroups>,
}

impl CompiledTable {
    pub fn static_route(&self, method: &str, path: &str) -> Option<RouteId> {
        self.statics.get(method).and_then(|m| m.get(path)).copied()
    }

    pub fn groups(&self, method: &str) -> Option<&MethodGroups> {
        self.dynamic.get(method)
    }

    /// Every method with a static or dynamic entry.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        let dynamic_only = self
            .dynamic
            .keys()
            .filter(|m| !self.statics.contains_key(*m));
        self.statics.keys().chain(dynamic_only).map(String::as_str)
    }

    /// Static lookup, then the method's dynamic groups.
    pub fn lookup<H>(
        &self,
        routes: &RouteCollection<H>,
        method: &str,
        path: &str,
    ) -> Option<(RouteId, Params)> {
        if let Some(id) = self.static_route(method, path) {
            return Some((id, Params::new()));
        }
        self.groups(method)?.match_path(routes, path)
    }
}

/// Stateless compiler from a route collection to a routing table.
pub struct RouteCompiler;

impl RouteCompiler {
    pub fn compile<H>(routes: &RouteCollection<H>) -> CompiledTable {
        let mut statics: HashMap<String, HashMap<String, RouteId>> = HashMap::new();
        let mut buckets: HashMap<String, Vec<(String, Vec<RouteId>)>> = HashMap::new();

        for (id, route) in routes.iter() {
            if route.is_static() {
                statics
                    .entry(route.method().to_string())
                    .or_default()
                    .insert(route.path().to_string(), id);
                continue;
            }

            let key = group_key(route.path());
            let method_buckets = buckets.entry(route.method().to_string()).or_default();
            match method_buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, ids)) => ids.push(id),
                None => method_buckets.push((key, vec![id])),
            }
        }

        let dynamic = buckets
            .into_iter()
            .map(|(method, keyed)| {
                let groups = keyed
                    .into_iter()
                    .filter_map(|(key, ids)| build_group(routes, &ids).map(|g| (key, g)))
                    .collect();
                (method, MethodGroups::from_groups(groups))
            })
            .collect();

        CompiledTable { statics, dynamic }
    }
}

/// Group key of a dynamic route path.
pub fn group_key(path: &str) -> String {
    let segment = pattern::first_segment(path);
    if segment.contains('{') {
        DYNAMIC_BUCKET.to_string()
    } else {
        segment.to_string()
    }
}

/// Build one group from route ids in registration order.
pub(crate) fn build_group<H>(routes: &RouteCollection<H>, ids: &[RouteId]) -> Option<Group> {
    match ids {
        [] => None,
        [id] => {
            let route = routes.get(*id)?;
            Some(Group::Single {
                route: *id,
                pattern: route.pattern().to_string(),
            })
        }
        _ => {
            let mut bodies = Vec::with_capacity(ids.len());
            let mut members = Vec::with_capacity(ids.len());
            for (index, id) in ids.iter().enumerate() {
                let Some(route) = routes.get(*id) else { continue };
                let body = route.body_with_groups(|k| member_param_group(index, k));
                bodies.push(format!("(?P<{}>{})", member_group(index), body));
                members.push(GroupMember::new(index, *id, route.parameter_names().len()));
            }
            let pattern = pattern::anchor(&format!("(?:{})", bodies.join("|")));
            let regex = compile_combined(&pattern);
            Some(Group::Combined {
                pattern,
                regex,
                members,
            })
        }
    }
}

pub(crate) fn compile_combined(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!(error = %err, "Combined group pattern failed to compile, matching members one by one");
            None
        }
    }
}

fn member_group(index: usize) -> String {
    format!("r{}", index)
}

fn member_param_group(index: usize, k: usize) -> String {
    format!("r{}_p{}", index, k)
}
