//! Matching behavior through the public router API.

use route_engine::routing::{Handler, Params, Route, RouteCollection, RouteCompiler, Router};

mod common;

use common::{label, register_blog_routes, Label};

fn blog_router() -> Router<Label> {
    let mut router = Router::new();
    register_blog_routes(&mut router);
    router
}

#[test]
fn test_static_routes_match_with_and_without_trailing_slash() {
    let mut router = blog_router();
    for (path, expected) in [("/", "home"), ("/about", "about"), ("/posts", "posts.index")] {
        let found = router.match_route("GET", path).unwrap();
        assert_eq!(label(&found), expected);
        assert!(found.params().is_empty());

        if path != "/" {
            let slashed = format!("{}/", path);
            assert_eq!(label(&router.match_route("GET", &slashed).unwrap()), expected);
        }
    }
}

#[test]
fn test_single_parameter_route() {
    let mut router = Router::new();
    router.get("/users/{id}", "users.show");

    let found = router.match_route("GET", "/users/123").unwrap();
    assert_eq!(label(&found), "users.show");
    assert_eq!(found.params().get("id"), Some("123"));

    assert!(router.match_route("GET", "/users/123/x").is_none());
    assert!(router.match_route("GET", "/users").is_none());
}

#[test]
fn test_where_takes_effect_without_reregistration() {
    let mut router = Router::new();
    router.get("/users/{id}", "users.show");
    assert!(router.match_route("GET", "/users/abc").is_some());

    router.where_param("id", r"\d+");
    assert!(router.match_route("GET", "/users/42").is_some());
    assert!(router.match_route("GET", "/users/abc").is_none());
}

#[test]
fn test_archive_scenario() {
    let mut router = blog_router();
    let found = router.match_route("GET", "/archive/2024/months/06").unwrap();
    assert_eq!(label(&found), "archive");
    let expected: Params = [("year", "2024"), ("month", "06")].into_iter().collect();
    assert_eq!(found.params(), &expected);

    assert!(router.match_route("GET", "/archive/abcd/months/06").is_none());
}

#[test]
fn test_grouped_matching_equals_reference_scan() {
    let patterns = [
        "/posts/{slug}",
        r"/posts/{id:\d+}/comments",
        "/posts/{slug}/comments/{comment}",
        "/posts/{slug}/{action:edit|delete}",
        "/posts/featured/{n}",
        "/{any}/comments",
        "/{lang}/docs/{page:.+}",
        "/media/{path:.*}",
    ];
    let mut reference: RouteCollection<usize> = RouteCollection::new();
    for (i, pattern) in patterns.iter().enumerate() {
        reference.add(Route::new("GET", *pattern, i), None);
    }
    let table = RouteCompiler::compile(&reference);

    let paths = [
        "/posts/hello",
        "/posts/12/comments",
        "/posts/hello/comments",
        "/posts/hello/comments/3",
        "/posts/hello/edit",
        "/posts/hello/publish",
        "/posts/featured/2",
        "/tags/comments",
        "/en/docs/getting/started",
        "/media/",
        "/media/a/b.png",
        "/unknown",
        "/",
    ];
    for path in paths {
        assert_eq!(
            table.lookup(&reference, "GET", path),
            reference.match_route("GET", path),
            "grouped and reference results differ for {}",
            path
        );
    }
}

#[test]
fn test_first_registered_route_wins() {
    let mut router = Router::new();
    router.get("/files/{name}", "by-name");
    router.get(r"/files/{id:\d+}", "by-id");

    let found = router.match_route("GET", "/files/42").unwrap();
    assert_eq!(label(&found), "by-name");
    assert_eq!(found.params().get("name"), Some("42"));
}

#[test]
fn test_head_and_options_semantics() {
    let mut router = Router::new();
    router.get("/x", "get-x");

    assert_eq!(label(&router.match_route("HEAD", "/x").unwrap()), "get-x");

    let found = router.match_route("OPTIONS", "/x").unwrap();
    match found.handler() {
        Handler::Allow(allow) => assert!(allow.invoke().contains("GET")),
        Handler::Route(_) => panic!("expected the synthetic OPTIONS handler"),
    }
}

#[test]
fn test_allowed_methods_for_405_decisions() {
    let mut router = blog_router();
    let allowed: Vec<String> = router.allowed_methods("/posts/hello").into_iter().collect();
    assert_eq!(allowed, vec!["DELETE", "GET", "PUT"]);

    assert!(router.match_route("PATCH", "/posts/hello").is_none());
    assert!(router.allowed_methods("/nothing/here/at/all").is_empty());
}

#[test]
fn test_multi_segment_fragment() {
    let mut router = blog_router();
    let found = router.match_route("GET", "/en/docs/guide/install").unwrap();
    assert_eq!(label(&found), "docs");
    assert_eq!(found.params().get("lang"), Some("en"));
    assert_eq!(found.params().get("page"), Some("guide/install"));
}

#[test]
fn test_compilation_is_idempotent() {
    let mut router = blog_router();
    router.compile_routes();
    let first = router.snapshot().unwrap();
    router.compile_routes();
    let second = router.snapshot().unwrap();
    assert_eq!(first, second);
}
