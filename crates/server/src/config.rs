//! Environment-driven server configuration.

use std::time::Duration;

use gist::{EngineConfig, ScrapeConfig};

/// Runtime configuration, resolved from the environment with defaults.
#[derive(Debug, Clone)]
pub struct Config {
	/// Listen port (`PORT`).
	pub port: u16,
	pub engine: EngineConfig,
	pub scrape: ScrapeConfig,
}

impl Config {
	pub fn from_env() -> Self {
		let mut engine = EngineConfig::default();
		if std::env::var_os("GIST_HEADFUL").is_some() {
			engine.headless = false;
		}

		let mut scrape = ScrapeConfig::default();
		if let Some(n) = env_u64("GIST_MAX_SESSIONS") {
			scrape.max_sessions = n as usize;
		}
		if let Some(ms) = env_u64("GIST_NAV_TIMEOUT_MS") {
			scrape.nav_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = env_u64("GIST_SETTLE_MS") {
			scrape.settle_delay = Duration::from_millis(ms);
		}
		if let Some(n) = env_u64("GIST_MIN_TEXT_LEN") {
			scrape.min_text_len = n as usize;
		}

		Self {
			port: env_u64("PORT").map(|p| p as u16).unwrap_or(3000),
			engine,
			scrape,
		}
	}
}

fn env_u64(key: &str) -> Option<u64> {
	std::env::var(key).ok().and_then(|v| v.parse().ok())
}
