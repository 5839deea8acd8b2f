//! Response handling for matched routes.
//!
//! # Responsibilities
//! - Serve configured static responses for matched routes
//! - Substitute `{name}` in the body with matched parameters
//! - Map NoMatch to 404 and a known path with the wrong method to 405
//!
//! # Design Decisions
//! - Templates are plain handlers: they implement `Endpoint`
//! - 405 and OPTIONS answers carry an `Allow` header

use std::collections::BTreeSet;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::ResponseConfig;
use crate::routing::{Endpoint, Params};

/// Configured response for one route.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    status: StatusCode,
    body: String,
    content_type: String,
}

impl ResponseTemplate {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: ResponseConfig::default().content_type,
        }
    }

    pub fn from_config(config: &ResponseConfig) -> Self {
        Self {
            status: StatusCode::from_u16(config.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: config.body.clone(),
            content_type: config.content_type.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body with `{name}` placeholders replaced by parameter values.
    pub fn render(&self, params: &Params) -> String {
        params.iter().fold(self.body.clone(), |body, (name, value)| {
            body.replace(&format!("{{{}}}", name), value)
        })
    }
}

impl Endpoint for ResponseTemplate {
    type Output = Response;

    fn call(&self, params: &Params) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type.clone())],
            self.render(params),
        )
            .into_response()
    }
}

/// Answer to OPTIONS for a known path.
pub fn options_response(allow: String) -> Response {
    (StatusCode::NO_CONTENT, [(header::ALLOW, allow)]).into_response()
}

/// Answer when no route matched the method.
pub fn no_match_response(allowed: &BTreeSet<String>) -> Response {
    if allowed.is_empty() {
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    }
    let allow = allowed.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        "Method not allowed",
    )
        .into_response()
}
