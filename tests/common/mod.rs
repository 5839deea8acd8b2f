//! Shared utilities for integration tests.

use route_engine::routing::{Handler, RouteMatch, Router};

/// Handler used by the integration tests: a static label.
pub type Label = &'static str;

/// Register a small blog-style route table.
pub fn register_blog_routes(router: &mut Router<Label>) {
    router.get("/", "home");
    router.get("/about", "about");
    router.get("/posts", "posts.index");
    router.get("/posts/{slug}", "posts.show");
    router.get(r"/posts/{id:\d+}/comments", "comments.index");
    router.get("/posts/{slug}/comments/{comment}", "comments.show");
    router.post("/posts", "posts.create");
    router.put("/posts/{slug}", "posts.update");
    router.delete("/posts/{slug}", "posts.delete");
    router.get("/{lang}/docs/{page:.+}", "docs");
    router.get(r"/archive/{year:\d{4}}/months/{month:\d{2}}", "archive");
}

/// Label of a matched route handler.
#[allow(dead_code)]
pub fn label(found: &RouteMatch<'_, Label>) -> Label {
    match found.handler() {
        Handler::Route(label) => **label,
        Handler::Allow(_) => panic!("expected a route handler, got the OPTIONS handler"),
    }
}
