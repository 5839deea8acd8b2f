//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, fallback handler)
//!     → routing::Router::match_compiled(method, path)
//!     → response.rs (invoke template, OPTIONS, 404/405)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use response::ResponseTemplate;
pub use server::{app, HttpServer};
