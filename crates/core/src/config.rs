//! Engine launch and per-request scrape configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Navigation wait strategy used by page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
	/// Resolve once the document structure is parsed, before network
	/// quiescence. Bounds latency on pages with long-lived connections.
	#[default]
	DomContentLoaded,
	/// Resolve once the load lifecycle event fires.
	Load,
}

/// Launch configuration for the shared rendering engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Whether the engine launches headless.
	pub headless: bool,
	/// Disable the Chromium sandbox (required inside most containers).
	pub no_sandbox: bool,
	/// Disable GPU acceleration.
	pub disable_gpu: bool,
	/// Avoid /dev/shm, which is tiny on constrained hosts.
	pub disable_dev_shm: bool,
	/// Explicit engine executable; auto-detected when unset.
	pub executable: Option<PathBuf>,
	/// Upper bound on engine startup.
	pub start_timeout: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			headless: true,
			no_sandbox: true,
			disable_gpu: true,
			disable_dev_shm: true,
			executable: None,
			start_timeout: Duration::from_secs(120),
		}
	}
}

impl EngineConfig {
	/// Command-line switches implied by the constrained-host flags.
	pub fn extra_args(&self) -> Vec<&'static str> {
		let mut args = Vec::new();
		if self.no_sandbox {
			args.push("--no-sandbox");
		}
		if self.disable_gpu {
			args.push("--disable-gpu");
		}
		if self.disable_dev_shm {
			args.push("--disable-dev-shm-usage");
		}
		args
	}
}

/// Identity applied to every isolated session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// BCP 47 locale reported to pages.
	pub locale: String,
	/// IANA timezone identifier reported to pages.
	pub timezone: String,
	/// User-agent override; the engine default when unset.
	pub user_agent: Option<String>,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			locale: "en-US".to_string(),
			timezone: "UTC".to_string(),
			user_agent: None,
		}
	}
}

/// End-to-end per-request behavior.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
	/// Identity for sessions opened from the shared engine.
	pub session: SessionOptions,
	/// Wait condition navigations resolve on.
	pub wait_until: WaitUntil,
	/// Default navigation budget when the request does not supply one.
	pub nav_timeout: Duration,
	/// Delay applied after the load condition so client-side content
	/// injection can finish. Best-effort heuristic: pages that render
	/// later than this still come out truncated.
	pub settle_delay: Duration,
	/// Minimum normalized length for a candidate region to win.
	pub min_text_len: usize,
	/// Ceiling on concurrently open sessions; 0 removes the bound.
	pub max_sessions: usize,
}

impl Default for ScrapeConfig {
	fn default() -> Self {
		Self {
			session: SessionOptions::default(),
			wait_until: WaitUntil::default(),
			nav_timeout: Duration::from_secs(30),
			settle_delay: Duration::from_secs(2),
			min_text_len: 400,
			max_sessions: 8,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn engine_defaults_target_constrained_hosts() {
		let cfg = EngineConfig::default();
		assert!(cfg.headless);
		assert_eq!(
			cfg.extra_args(),
			vec!["--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"]
		);
		assert_eq!(cfg.start_timeout, Duration::from_secs(120));
	}

	#[test]
	fn extra_args_follow_flags() {
		let cfg = EngineConfig {
			no_sandbox: false,
			disable_gpu: false,
			disable_dev_shm: false,
			..EngineConfig::default()
		};
		assert!(cfg.extra_args().is_empty());
	}

	#[test]
	fn scrape_defaults_are_bounded() {
		let cfg = ScrapeConfig::default();
		assert_eq!(cfg.wait_until, WaitUntil::DomContentLoaded);
		assert_eq!(cfg.nav_timeout, Duration::from_secs(30));
		assert_eq!(cfg.settle_delay, Duration::from_secs(2));
		assert_eq!(cfg.min_text_len, 400);
		assert_eq!(cfg.max_sessions, 8);
	}
}
