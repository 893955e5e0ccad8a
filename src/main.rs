use clap::Parser;
use tracing_subscriber::EnvFilter;

use store_router::config::{Args, Config};
use store_router::{LayoutManager, LayoutStore, Server};

fn main() {
    let config = Config::resolve(Args::parse());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .init();

    tracing::info!(cache_dir = %config.cache_dir, bind = %config.bind_address, "starting engine");

    let store = LayoutStore::new(&config.cache_dir).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to open layout cache directory");
        std::process::exit(1);
    });
    let manager = LayoutManager::new();
    let server = Server::new(store, manager);

    if let Err(e) = server.run(&config.bind_address) {
        tracing::error!(error = %e, "server exited");
        std::process::exit(1);
    }
}
