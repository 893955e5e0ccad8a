//! Process configuration: CLI flags with environment-variable fallbacks.
//!
//! Precedence matches the convention used elsewhere in this stack: an
//! explicit CLI flag wins, then an environment variable, then a baked-in
//! default.

use clap::Parser;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_CACHE_DIR: &str = "layout_cache";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(version, about = "Indoor path-optimization engine")]
pub struct Args {
    /// Address to bind the HTTP server on.
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding uploaded layouts, their SVGs, and the current-hash pointer.
    #[arg(long)]
    cache_dir: Option<String>,

    /// `tracing-subscriber` env-filter string.
    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub cache_dir: String,
    pub log_filter: String,
}

impl Config {
    /// Resolve from parsed CLI args with environment-variable fallbacks.
    pub fn resolve(args: Args) -> Self {
        let bind_address = args
            .bind
            .or_else(|| std::env::var("ENGINE_BIND_ADDRESS").ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let cache_dir = args
            .cache_dir
            .or_else(|| std::env::var("ENGINE_CACHE_DIR").ok())
            .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());

        let log_filter = args
            .log_filter
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            bind_address,
            cache_dir,
            log_filter,
        }
    }
}
