//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing, cache, http produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with fields, not interpolated strings
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
