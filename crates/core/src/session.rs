//! Per-request isolated sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::{SessionOptions, WaitUntil};
use crate::engine::{Engine, Surface};
use crate::error::{NavigateError, SessionError};

/// One isolated browsing session, exclusively owned by a single request.
///
/// Closed explicitly on every exit path. If the owning future is dropped
/// first (client disconnect), the Drop fallback spawns a background close
/// so the surface is still released exactly once.
pub struct Session {
	surface: Option<Box<dyn Surface>>,
	permit: Option<OwnedSemaphorePermit>,
	opened_at: Instant,
	runtime: Option<tokio::runtime::Handle>,
}

impl Session {
	pub(crate) fn new(surface: Box<dyn Surface>, permit: Option<OwnedSemaphorePermit>) -> Self {
		Self {
			surface: Some(surface),
			permit,
			opened_at: Instant::now(),
			runtime: tokio::runtime::Handle::try_current().ok(),
		}
	}

	/// Time since the session was opened.
	pub fn age(&self) -> Duration {
		self.opened_at.elapsed()
	}

	fn surface_mut(&mut self) -> Result<&mut (dyn Surface + 'static), SessionError> {
		self.surface.as_deref_mut().ok_or(SessionError::Closed)
	}

	/// Navigates the session's surface to `url`.
	pub async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<(), NavigateError> {
		match self.surface_mut() {
			Ok(surface) => surface.goto(url, wait).await,
			Err(err) => Err(NavigateError::Load {
				url: url.to_string(),
				source: Box::new(err),
			}),
		}
	}

	/// Rendered text of the first node matching `selector`, if any.
	pub async fn inner_text(&mut self, selector: &str) -> Result<Option<String>, SessionError> {
		self.surface_mut()?.inner_text(selector).await
	}

	/// Closes the surface and its context. Best-effort: failures are
	/// logged and never escalate past this point.
	pub async fn close(mut self) {
		if let Some(mut surface) = self.surface.take() {
			if let Err(err) = surface.close().await {
				warn!(target = "gist.session", error = %err, "session close failed");
			}
		}
		// The concurrency permit drops with self, freeing a slot.
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		let Some(mut surface) = self.surface.take() else {
			return;
		};
		let permit = self.permit.take();
		match &self.runtime {
			Some(handle) => {
				handle.spawn(async move {
					if let Err(err) = surface.close().await {
						warn!(
							target = "gist.session",
							error = %err,
							"background session close failed"
						);
					}
					drop(permit);
				});
			}
			None => warn!(
				target = "gist.session",
				"session dropped outside a runtime; surface leaked"
			),
		}
	}
}

/// Opens isolated sessions from the shared engine.
///
/// When a ceiling is configured, session creation waits on a counting
/// semaphore so at most that many sessions are open at once; the slot is
/// returned when the session closes.
pub struct SessionFactory {
	options: SessionOptions,
	limiter: Option<Arc<Semaphore>>,
}

impl SessionFactory {
	/// `max_sessions` caps concurrently open sessions; 0 removes the bound.
	pub fn new(options: SessionOptions, max_sessions: usize) -> Self {
		Self {
			options,
			limiter: (max_sessions > 0).then(|| Arc::new(Semaphore::new(max_sessions))),
		}
	}

	/// Opens one isolated session from `engine`.
	pub async fn open(&self, engine: &dyn Engine) -> Result<Session, SessionError> {
		let permit = match &self.limiter {
			Some(limiter) => Some(
				Arc::clone(limiter)
					.acquire_owned()
					.await
					.map_err(|_| SessionError::Open("session limiter closed".to_string()))?,
			),
			None => None,
		};

		let surface = engine.open_surface(&self.options).await?;
		debug!(target = "gist.session", "session opened");
		Ok(Session::new(surface, permit))
	}
}
