//! Per-request orchestration.
//!
//! Composes engine acquisition, session opening, navigation, and
//! extraction for one request, and guarantees the session is torn down on
//! every exit path. The shared engine is never released here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::config::ScrapeConfig;
use crate::engine::{EngineHandle, EngineLauncher};
use crate::error::{Result, ScrapeError};
use crate::extract::Extractor;
use crate::navigate::Navigator;
use crate::session::{Session, SessionFactory};

/// Outcome of one successful scrape. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
	/// The originating URL.
	pub url: String,
	/// Extracted article text.
	pub text: String,
	/// Character count of `text`.
	pub length: usize,
	/// Wall-clock milliseconds from request start to extraction end.
	pub ms: u64,
}

/// Per-request orchestrator over the shared engine.
pub struct Scraper {
	engine: EngineHandle,
	sessions: SessionFactory,
	navigator: Navigator,
	extractor: Extractor,
	nav_timeout: Duration,
}

impl Scraper {
	pub fn new(launcher: Arc<dyn EngineLauncher>, config: ScrapeConfig) -> Self {
		Self {
			engine: EngineHandle::new(launcher),
			sessions: SessionFactory::new(config.session, config.max_sessions),
			navigator: Navigator::new(config.wait_until, config.settle_delay),
			extractor: Extractor::new(config.min_text_len),
			nav_timeout: config.nav_timeout,
		}
	}

	/// Eagerly starts the shared engine. Failure is logged and the first
	/// request retries acquisition.
	pub async fn warm_up(&self) {
		self.engine.warm_up().await;
	}

	/// Renders `url` in an isolated session and extracts its article text.
	///
	/// `wait` overrides the navigation budget for this request. Input is
	/// validated before any engine or session resource is acquired. The
	/// session opened for the request is closed whether navigation and
	/// extraction succeed or fail.
	pub async fn scrape(&self, url: &str, wait: Option<Duration>) -> Result<Extraction> {
		let target = parse_target(url)?;
		let budget = wait.unwrap_or(self.nav_timeout);
		let started = Instant::now();

		let engine = self.engine.acquire().await?;
		let mut session = self.sessions.open(engine.as_ref()).await?;

		let outcome = self.drive(&mut session, &target, budget).await;
		session.close().await;

		let text = outcome?;
		let ms = started.elapsed().as_millis() as u64;
		let length = text.chars().count();
		info!(target = "gist.scrape", url = %target, ms, length, "scrape finished");

		Ok(Extraction {
			url: target.into(),
			text,
			length,
			ms,
		})
	}

	async fn drive(&self, session: &mut Session, target: &Url, budget: Duration) -> Result<String> {
		self.navigator.load(session, target, budget).await?;
		Ok(self.extractor.extract(session).await)
	}
}

/// Rejects missing and unparseable URLs before any resource is acquired.
fn parse_target(raw: &str) -> Result<Url> {
	let raw = raw.trim();
	if raw.is_empty() {
		return Err(ScrapeError::MissingUrl);
	}
	Url::parse(raw).map_err(|source| ScrapeError::InvalidUrl {
		url: raw.to_string(),
		source,
	})
}
