//! gistd: browser-rendered article extraction service.

use std::sync::Arc;

use tracing::info;

use gist::{ChromiumLauncher, Scraper};
use gist_server::config::Config;
use gist_server::state::AppState;
use gist_server::{logging, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	logging::init();

	let config = Config::from_env();
	let launcher = Arc::new(ChromiumLauncher::new(config.engine.clone()));
	let state = Arc::new(AppState {
		scraper: Scraper::new(launcher, config.scrape.clone()),
	});

	// Eager engine warm-up; a failure here is logged and the first
	// request retries acquisition.
	let warm = Arc::clone(&state);
	tokio::spawn(async move { warm.scraper.warm_up().await });

	let app = routes::build_router(state);
	let addr = format!("0.0.0.0:{}", config.port);
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	info!(target = "gist.http", %addr, "gistd listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	Ok(())
}

async fn shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
	info!(target = "gist.http", "shutdown requested");
}
