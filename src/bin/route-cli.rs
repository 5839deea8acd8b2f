use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use route_engine::config::{load_config, EngineConfig};
use route_engine::lifecycle::startup::build_offline_router;
use route_engine::routing::{Handler, RouteKind};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect and test a route table offline (the route cache is not touched)", long_about = None)]
struct Cli {
    /// Route table (TOML).
    #[arg(short, long, default_value = "routes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration
    Check,
    /// List registered routes
    Routes,
    /// Match a method and path against the table
    Match { method: String, path: String },
    /// Print the compiled table as cached
    Table,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Check => {
            println!(
                "{}: ok ({} routes)",
                cli.config.display(),
                config.routes.len()
            );
        }
        Commands::Routes => print_json(&list_routes(&config)?)?,
        Commands::Match { method, path } => print_json(&match_path(&config, &method, &path)?)?,
        Commands::Table => {
            let router = build_offline_router(&config)?;
            print_json(&serde_json::to_value(router.snapshot())?)?;
        }
    }

    Ok(())
}

fn list_routes(config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let router = build_offline_router(config)?;
    let routes: Vec<Value> = router
        .routes()
        .iter()
        .map(|(_, route)| {
            json!({
                "method": route.method(),
                "path": route.path(),
                "name": route.name(),
                "kind": match route.kind() {
                    RouteKind::Static => "static",
                    RouteKind::Dynamic => "dynamic",
                },
                "pattern": route.pattern(),
                "parameters": route.parameter_names(),
            })
        })
        .collect();
    Ok(Value::Array(routes))
}

fn match_path(
    config: &EngineConfig,
    method: &str,
    path: &str,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut router = build_offline_router(config)?;
    if let Some(found) = router.match_route(method, path) {
        let value = match found.handler() {
            Handler::Route(_) => json!({
                "matched": true,
                "route": found.route().map(|r| r.path()),
                "name": found.route().and_then(|r| r.name()),
                "params": found.params(),
            }),
            Handler::Allow(allow) => json!({
                "matched": true,
                "allow": allow.invoke(),
            }),
        };
        return Ok(value);
    }

    let allowed = router.allowed_methods(path);
    Ok(json!({
        "matched": false,
        "status": if allowed.is_empty() { 404 } else { 405 },
        "allowed": allowed,
    }))
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
