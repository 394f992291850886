//! Shared engine lifecycle.
//!
//! The engine process is expensive to start, so [`EngineHandle`] guards it
//! with a single-flight start: the first caller launches, callers arriving
//! mid-start await the same shared future, and a failed start is cleared
//! so a later request retries fresh instead of wedging the process.

mod chromium;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

pub use chromium::ChromiumLauncher;

use crate::config::{SessionOptions, WaitUntil};
use crate::error::{EngineError, NavigateError, SessionError};

/// Shared rendering-engine capability.
///
/// Read-only shared state after a successful start: requests open surfaces
/// from it but never mutate it.
#[async_trait]
pub trait Engine: Send + Sync {
	/// Opens an isolated browsing surface: a fresh cookie/storage context
	/// plus one navigable page. No state leaks between surfaces opened
	/// from the same engine.
	async fn open_surface(
		&self,
		options: &SessionOptions,
	) -> Result<Box<dyn Surface>, SessionError>;
}

/// One navigable page inside an isolated context.
#[async_trait]
pub trait Surface: Send {
	/// Navigates to `url`, resolving once `wait` is met.
	async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<(), NavigateError>;

	/// Rendered text of the first node matching `selector`, if any.
	async fn inner_text(&mut self, selector: &str) -> Result<Option<String>, SessionError>;

	/// Releases the page and its context. Idempotent.
	async fn close(&mut self) -> Result<(), SessionError>;
}

/// Starts the engine process; the seam between [`EngineHandle`] and a
/// concrete engine implementation.
#[async_trait]
pub trait EngineLauncher: Send + Sync + 'static {
	async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError>;
}

type SharedStart = Shared<BoxFuture<'static, Result<Arc<dyn Engine>, EngineError>>>;

enum StartPhase {
	Idle,
	Starting(SharedStart),
	Ready(Arc<dyn Engine>),
}

struct StartState {
	/// Bumped for every fresh start attempt so a stale waiter cannot
	/// clobber the phase of a newer attempt.
	generation: u64,
	phase: StartPhase,
}

/// Process-wide handle to the single shared engine.
pub struct EngineHandle {
	launcher: Arc<dyn EngineLauncher>,
	state: Mutex<StartState>,
}

impl EngineHandle {
	pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
		Self {
			launcher,
			state: Mutex::new(StartState {
				generation: 0,
				phase: StartPhase::Idle,
			}),
		}
	}

	/// Returns the shared engine, starting it on first use.
	///
	/// At most one start is in flight at any time; every caller that
	/// arrives during it receives the same outcome. Success is cached for
	/// the remainder of the process; failure clears the attempt so the
	/// next caller launches fresh.
	pub async fn acquire(&self) -> Result<Arc<dyn Engine>, EngineError> {
		let (start, generation) = {
			let mut state = self.state.lock();
			match &state.phase {
				StartPhase::Ready(engine) => return Ok(Arc::clone(engine)),
				StartPhase::Starting(start) => (start.clone(), state.generation),
				StartPhase::Idle => {
					state.generation += 1;
					let launcher = Arc::clone(&self.launcher);
					let start: SharedStart =
						async move { launcher.launch().await }.boxed().shared();
					state.phase = StartPhase::Starting(start.clone());
					debug!(target = "gist.engine", generation = state.generation, "engine start initiated");
					(start, state.generation)
				}
			}
		};

		let result = start.await;

		let mut state = self.state.lock();
		if state.generation == generation && matches!(state.phase, StartPhase::Starting(_)) {
			state.phase = match &result {
				Ok(engine) => StartPhase::Ready(Arc::clone(engine)),
				Err(_) => StartPhase::Idle,
			};
		}
		result
	}

	/// Eagerly starts the engine at boot. Failure is logged, not fatal:
	/// the first request retries acquisition.
	pub async fn warm_up(&self) {
		match self.acquire().await {
			Ok(_) => debug!(target = "gist.engine", "engine warm-up complete"),
			Err(err) => warn!(
				target = "gist.engine",
				error = %err,
				"engine warm-up failed; will retry on first request"
			),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use super::*;

	struct NullEngine;

	#[async_trait]
	impl Engine for NullEngine {
		async fn open_surface(
			&self,
			_options: &SessionOptions,
		) -> Result<Box<dyn Surface>, SessionError> {
			Err(SessionError::EngineClosed)
		}
	}

	/// Launcher that fails the first `failures` launches, then succeeds.
	struct FlakyLauncher {
		launches: AtomicUsize,
		failures: usize,
		delay: Duration,
	}

	impl FlakyLauncher {
		fn new(failures: usize, delay: Duration) -> Self {
			Self {
				launches: AtomicUsize::new(0),
				failures,
				delay,
			}
		}
	}

	#[async_trait]
	impl EngineLauncher for FlakyLauncher {
		async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError> {
			let attempt = self.launches.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(self.delay).await;
			if attempt < self.failures {
				Err(EngineError::Start("no usable engine".to_string()))
			} else {
				Ok(Arc::new(NullEngine))
			}
		}
	}

	#[tokio::test]
	async fn concurrent_acquires_share_one_start() {
		let launcher = Arc::new(FlakyLauncher::new(0, Duration::from_millis(20)));
		let handle = Arc::new(EngineHandle::new(Arc::clone(&launcher) as Arc<dyn EngineLauncher>));

		let tasks: Vec<_> = (0..16)
			.map(|_| {
				let handle = Arc::clone(&handle);
				tokio::spawn(async move { handle.acquire().await.is_ok() })
			})
			.collect();
		for task in tasks {
			assert!(task.await.unwrap());
		}

		assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn ready_engine_is_reused_without_relaunching() {
		let launcher = Arc::new(FlakyLauncher::new(0, Duration::ZERO));
		let handle = EngineHandle::new(Arc::clone(&launcher) as Arc<dyn EngineLauncher>);

		assert!(handle.acquire().await.is_ok());
		assert!(handle.acquire().await.is_ok());
		assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn failed_start_is_shared_then_cleared_for_retry() {
		let launcher = Arc::new(FlakyLauncher::new(1, Duration::from_millis(20)));
		let handle = Arc::new(EngineHandle::new(Arc::clone(&launcher) as Arc<dyn EngineLauncher>));

		// All waiters of the first attempt see the same failure.
		let tasks: Vec<_> = (0..4)
			.map(|_| {
				let handle = Arc::clone(&handle);
				tokio::spawn(async move { handle.acquire().await.is_err() })
			})
			.collect();
		for task in tasks {
			assert!(task.await.unwrap());
		}
		assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

		// The failure was not cached: the next caller starts fresh.
		assert!(handle.acquire().await.is_ok());
		assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn warm_up_failure_does_not_poison_the_handle() {
		let launcher = Arc::new(FlakyLauncher::new(1, Duration::ZERO));
		let handle = EngineHandle::new(Arc::clone(&launcher) as Arc<dyn EngineLauncher>);

		handle.warm_up().await;
		assert!(handle.acquire().await.is_ok());
		assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
	}
}
