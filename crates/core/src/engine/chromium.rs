//! Chromium-backed engine over the Chrome DevTools Protocol.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
	SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
	CreateBrowserContextParams, CreateTargetParams,
};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Engine, EngineLauncher, Surface};
use crate::config::{EngineConfig, SessionOptions, WaitUntil};
use crate::error::{EngineError, NavigateError, SessionError};

/// Launches the shared Chromium engine described by [`EngineConfig`].
pub struct ChromiumLauncher {
	config: EngineConfig,
}

impl ChromiumLauncher {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
	async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError> {
		let mut builder = BrowserConfig::builder();
		if !self.config.headless {
			builder = builder.with_head();
		}
		if let Some(executable) = resolve_executable(&self.config) {
			builder = builder.chrome_executable(executable);
		}
		builder = builder.args(self.config.extra_args());
		let browser_config = builder.build().map_err(EngineError::Start)?;

		let (browser, mut events) =
			tokio::time::timeout(self.config.start_timeout, Browser::launch(browser_config))
				.await
				.map_err(|_| EngineError::StartTimeout(self.config.start_timeout))?
				.map_err(|e| EngineError::Start(e.to_string()))?;

		// CDP event pump; the stream ends when the browser goes away.
		let event_pump = tokio::spawn(async move {
			while let Some(event) = events.next().await {
				if let Err(err) = event {
					debug!(target = "gist.engine", error = %err, "cdp event loop ended");
					break;
				}
			}
		});

		debug!(target = "gist.engine", "chromium engine started");
		Ok(Arc::new(ChromiumEngine {
			browser: Arc::new(Mutex::new(browser)),
			event_pump,
		}))
	}
}

/// Engine executable, resolved in order: `GIST_CHROME` environment
/// override, explicit config path, then chromiumoxide auto-detection.
fn resolve_executable(config: &EngineConfig) -> Option<PathBuf> {
	if let Some(path) = std::env::var_os("GIST_CHROME") {
		let path = PathBuf::from(path);
		if path.exists() {
			return Some(path);
		}
		warn!(
			target = "gist.engine",
			path = %path.display(),
			"GIST_CHROME does not exist; falling back"
		);
	}
	config.executable.clone()
}

/// The long-lived Chromium process, shared by every request.
pub struct ChromiumEngine {
	browser: Arc<Mutex<Browser>>,
	event_pump: JoinHandle<()>,
}

impl Drop for ChromiumEngine {
	fn drop(&mut self) {
		self.event_pump.abort();
	}
}

#[async_trait]
impl Engine for ChromiumEngine {
	async fn open_surface(
		&self,
		options: &SessionOptions,
	) -> Result<Box<dyn Surface>, SessionError> {
		// Fresh browser context: independent cookies, storage, and cache.
		let context_id = {
			let mut browser = self.browser.lock().await;
			browser
				.create_browser_context(CreateBrowserContextParams::default())
				.await
				.map_err(|e| SessionError::Open(e.to_string()))?
		};

		let mut target = CreateTargetParams::new("about:blank");
		target.browser_context_id = Some(context_id.clone());
		let page = {
			let browser = self.browser.lock().await;
			browser
				.new_page(target)
				.await
				.map_err(|e| SessionError::Open(e.to_string()))?
		};

		if let Err(err) = apply_identity(&page, options).await {
			let _ = page.close().await;
			let mut browser = self.browser.lock().await;
			let _ = browser.dispose_browser_context(context_id).await;
			return Err(err);
		}

		Ok(Box::new(ChromiumSurface {
			browser: Arc::clone(&self.browser),
			page: Some(page),
			context_id: Some(context_id),
		}))
	}
}

async fn apply_identity(page: &Page, options: &SessionOptions) -> Result<(), SessionError> {
	if let Some(user_agent) = &options.user_agent {
		page.set_user_agent(SetUserAgentOverrideParams::new(user_agent.clone()))
			.await
			.map_err(|e| SessionError::Open(e.to_string()))?;
	}

	let mut locale = SetLocaleOverrideParams::default();
	locale.locale = Some(options.locale.clone());
	page.execute(locale)
		.await
		.map_err(|e| SessionError::Open(e.to_string()))?;

	page.execute(SetTimezoneOverrideParams::new(options.timezone.clone()))
		.await
		.map_err(|e| SessionError::Open(e.to_string()))?;

	Ok(())
}

/// One page in its own browser context.
struct ChromiumSurface {
	browser: Arc<Mutex<Browser>>,
	page: Option<Page>,
	context_id: Option<BrowserContextId>,
}

impl ChromiumSurface {
	fn page(&self) -> Result<&Page, SessionError> {
		self.page.as_ref().ok_or(SessionError::Closed)
	}
}

#[async_trait]
impl Surface for ChromiumSurface {
	async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<(), NavigateError> {
		let load_failed = |e: chromiumoxide::error::CdpError| NavigateError::Load {
			url: url.to_string(),
			source: Box::new(e),
		};
		let page = self.page().map_err(|e| NavigateError::Load {
			url: url.to_string(),
			source: Box::new(e),
		})?;

		page.goto(url).await.map_err(load_failed)?;
		if wait == WaitUntil::Load {
			page.wait_for_navigation().await.map_err(load_failed)?;
		}
		Ok(())
	}

	async fn inner_text(&mut self, selector: &str) -> Result<Option<String>, SessionError> {
		let quoted =
			serde_json::to_string(selector).map_err(|e| SessionError::Eval(e.to_string()))?;
		let expression = format!(
			"(() => {{ const el = document.querySelector({quoted}); return el ? el.innerText : null; }})()"
		);

		self.page()?
			.evaluate(expression)
			.await
			.map_err(|e| SessionError::Eval(e.to_string()))?
			.into_value()
			.map_err(|e| SessionError::Eval(e.to_string()))
	}

	async fn close(&mut self) -> Result<(), SessionError> {
		let Some(page) = self.page.take() else {
			return Ok(());
		};
		let close_result = page
			.close()
			.await
			.map_err(|e| SessionError::Close(e.to_string()));

		// Dispose the context even when the page refused to close; it owns
		// the session's cookies and storage.
		if let Some(context_id) = self.context_id.take() {
			let mut browser = self.browser.lock().await;
			if let Err(err) = browser.dispose_browser_context(context_id).await {
				warn!(target = "gist.session", error = %err, "browser context dispose failed");
			}
		}

		close_result
	}
}
