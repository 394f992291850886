use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Failure to start the shared engine.
///
/// Clonable: a single start attempt may have many concurrent waiters, and
/// every one of them receives the same outcome.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
	#[error("engine start failed: {0}")]
	Start(String),

	#[error("engine start timed out after {0:?}")]
	StartTimeout(Duration),
}

/// Failure to open or operate an isolated browsing session.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("engine is closed")]
	EngineClosed,

	#[error("session open failed: {0}")]
	Open(String),

	#[error("session is closed")]
	Closed,

	#[error("evaluation failed: {0}")]
	Eval(String),

	#[error("session close failed: {0}")]
	Close(String),
}

/// Failure to load a target URL.
#[derive(Debug, Error)]
pub enum NavigateError {
	#[error("navigation timed out after {ms}ms: {url}")]
	Timeout { url: String, ms: u64 },

	#[error("navigation failed: {url}")]
	Load {
		url: String,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

/// Per-request failure surfaced at the orchestrator boundary.
///
/// Input errors are rejected before any engine or session resource is
/// acquired; everything else carries the failing stage.
#[derive(Debug, Error)]
pub enum ScrapeError {
	#[error("missing url")]
	MissingUrl,

	#[error("invalid url: {url}")]
	InvalidUrl {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error(transparent)]
	Engine(#[from] EngineError),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error(transparent)]
	Navigate(#[from] NavigateError),
}

impl ScrapeError {
	/// Machine-readable error kind used by the HTTP failure payload.
	pub fn kind(&self) -> &'static str {
		match self {
			ScrapeError::MissingUrl | ScrapeError::InvalidUrl { .. } => "bad_input",
			ScrapeError::Engine(_) => "engine_unavailable",
			ScrapeError::Session(_) => "session_open_failed",
			ScrapeError::Navigate(NavigateError::Timeout { .. }) => "navigation_timeout",
			ScrapeError::Navigate(_) => "navigation_failed",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn input_errors_map_to_bad_input() {
		assert_eq!(ScrapeError::MissingUrl.kind(), "bad_input");
		let err = ScrapeError::InvalidUrl {
			url: "nope".to_string(),
			source: url::Url::parse("nope").unwrap_err(),
		};
		assert_eq!(err.kind(), "bad_input");
	}

	#[test]
	fn navigation_timeout_has_its_own_kind() {
		let err = ScrapeError::Navigate(NavigateError::Timeout {
			url: "https://example.test/".to_string(),
			ms: 30_000,
		});
		assert_eq!(err.kind(), "navigation_timeout");
		assert!(err.to_string().contains("30000ms"));
	}

	#[test]
	fn engine_errors_are_clonable_for_shared_waiters() {
		let err = EngineError::Start("spawn failed".to_string());
		let cloned = err.clone();
		assert_eq!(err.to_string(), cloned.to_string());
	}
}
