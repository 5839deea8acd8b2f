//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     add_route(method, pattern, handler)
//!     → route.rs (parse pattern, compile anchored regex)
//!     → collection.rs (ordered registry, global constraints)
//!
//! First match (lazy):
//!     cached snapshot valid? → snapshot.rs (rehydrate against live routes)
//!     otherwise            → compiler.rs (static map + grouped regexes)
//!                            → snapshot persisted to the cache
//!
//! Incoming (method, path)
//!     → router.rs (HEAD/OPTIONS handling, trailing slash)
//!     → static exact lookup → first-segment group → __dynamic__ → other groups
//!     → Return: (handler, params) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Static routes never touch a regex
//! - Dynamic routes sharing a first segment share one alternation
//! - First registered route wins, same as a linear scan
//! - Handlers are generic and never serialized

pub mod collection;
pub mod compiler;
pub mod error;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;
pub mod snapshot;

pub use collection::{RouteCollection, RouteId};
pub use compiler::{CompiledTable, RouteCompiler, DYNAMIC_BUCKET};
pub use error::RouterError;
pub use params::Params;
pub use route::{Route, RouteKind};
pub use router::{
    AllowHandler, CompileSource, Dispatched, Endpoint, Handler, RouteMatch, RouteOptions, Router,
};
pub use snapshot::CachedTable;

/// Verbs registered by `Router::any`.
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];
