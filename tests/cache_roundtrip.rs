//! Compiled-table cache shared between router instances.

use std::sync::Arc;

use route_engine::cache::{FileCache, MemoryCache, RouteCache};
use route_engine::config::{CacheValidation, RouterConfig};
use route_engine::routing::{CompileSource, Router};

mod common;

use common::{label, register_blog_routes, Label};

const PATHS: [(&str, &str); 8] = [
    ("GET", "/"),
    ("GET", "/posts/hello"),
    ("GET", "/posts/7/comments"),
    ("GET", "/posts/hello/comments/2"),
    ("PUT", "/posts/hello"),
    ("GET", "/fr/docs/a/b"),
    ("GET", "/archive/2023/months/12"),
    ("GET", "/missing"),
];

fn outcomes(router: &mut Router<Label>) -> Vec<Option<(Label, Vec<(String, String)>)>> {
    PATHS
        .iter()
        .map(|(method, path)| {
            router.match_route(method, path).map(|found| {
                let params = found
                    .params()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (label(&found), params)
            })
        })
        .collect()
}

fn router_with(cache: Arc<dyn RouteCache>) -> Router<Label> {
    let mut router = Router::new().with_cache(cache);
    register_blog_routes(&mut router);
    router
}

#[test]
fn test_second_router_uses_memory_cache() {
    let cache = MemoryCache::new();

    let mut first = router_with(Arc::new(cache.clone()));
    let expected = outcomes(&mut first);
    assert_eq!(first.compile_source(), Some(CompileSource::Fresh));

    let mut second = router_with(Arc::new(cache.clone()));
    assert_eq!(outcomes(&mut second), expected);
    assert_eq!(second.compile_source(), Some(CompileSource::Cache));
    assert_eq!(second.snapshot(), first.snapshot());
}

#[test]
fn test_file_cache_survives_instances() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = router_with(Arc::new(FileCache::open(dir.path()).unwrap()));
    let expected = outcomes(&mut first);

    let mut second = router_with(Arc::new(FileCache::open(dir.path()).unwrap()));
    assert_eq!(outcomes(&mut second), expected);
    assert_eq!(second.compile_source(), Some(CompileSource::Cache));
}

#[test]
fn test_corrupt_cache_entry_is_a_miss() {
    let cache = MemoryCache::new();
    cache
        .set(&RouterConfig::default().cache_key, "not json".into(), None)
        .unwrap();

    let mut router = router_with(Arc::new(cache.clone()));
    assert!(router.match_route("GET", "/about").is_some());
    assert_eq!(router.compile_source(), Some(CompileSource::Fresh));

    let stored = cache.get(&RouterConfig::default().cache_key).unwrap().unwrap();
    assert!(stored.starts_with('{'));
}

#[test]
fn test_fingerprint_mode_detects_constraint_change() {
    let cache = MemoryCache::new();
    let config = RouterConfig {
        cache_validation: CacheValidation::Fingerprint,
        ..RouterConfig::default()
    };

    let mut first = Router::with_config(config.clone()).with_cache(Arc::new(cache.clone()));
    register_blog_routes(&mut first);
    first.compile_routes();

    let mut second = Router::with_config(config).with_cache(Arc::new(cache.clone()));
    register_blog_routes(&mut second);
    second.where_param("slug", "[a-z]+");
    assert!(second.match_route("GET", "/posts/abc1").is_none());
    assert_eq!(second.compile_source(), Some(CompileSource::Fresh));
}

#[test]
fn test_separate_cache_keys_do_not_collide() {
    let cache = MemoryCache::new();
    let other = RouterConfig {
        cache_key: "other.routes".into(),
        ..RouterConfig::default()
    };

    let mut first = router_with(Arc::new(cache.clone()));
    first.compile_routes();

    let mut second = Router::with_config(other).with_cache(Arc::new(cache.clone()));
    register_blog_routes(&mut second);
    assert_eq!(second.compile_routes(), CompileSource::Fresh);
    assert_eq!(cache.len(), 2);
}
