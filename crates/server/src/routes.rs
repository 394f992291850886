//! Route wiring and the request/response JSON contract.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::warn;

use gist::ScrapeError;

use crate::state::AppState;

/// Builds the service router.
pub fn build_router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/scrape", post(scrape))
		.route("/health", get(health))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
	#[serde(default)]
	url: Option<String>,
	/// Navigation budget in milliseconds.
	#[serde(default)]
	wait: Option<u64>,
}

/// Liveness only; does not probe engine state.
async fn health() -> Json<Value> {
	Json(json!({ "ok": true }))
}

async fn scrape(
	State(state): State<Arc<AppState>>,
	Json(body): Json<ScrapeRequest>,
) -> (StatusCode, Json<Value>) {
	let Some(url) = body.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
		return (
			StatusCode::BAD_REQUEST,
			Json(json!({ "error": "Missing URL" })),
		);
	};

	let wait = body.wait.map(Duration::from_millis);
	match state.scraper.scrape(url, wait).await {
		Ok(extraction) => (
			StatusCode::OK,
			Json(json!({
				"ok": true,
				"url": extraction.url,
				"ms": extraction.ms,
				"length": extraction.length,
				"text": extraction.text,
			})),
		),
		Err(err) => {
			warn!(target = "gist.http", url, error = %err, "scrape failed");
			(StatusCode::INTERNAL_SERVER_ERROR, Json(failure_body(&err)))
		}
	}
}

fn failure_body(err: &ScrapeError) -> Value {
	json!({
		"ok": false,
		"error": "Failed to scrape article",
		"detail": err.to_string(),
		"name": err.kind(),
		"stack": stack_lines(err).join("\n"),
	})
}

/// The error source chain, outermost first, truncated to five lines.
fn stack_lines(err: &ScrapeError) -> Vec<String> {
	let mut lines = vec![err.to_string()];
	let mut source = std::error::Error::source(err);
	while let Some(cause) = source {
		if lines.len() >= 5 {
			break;
		}
		lines.push(cause.to_string());
		source = cause.source();
	}
	lines
}

#[cfg(test)]
mod tests {
	use gist::NavigateError;

	use super::*;

	#[test]
	fn failure_body_is_machine_readable() {
		let err = ScrapeError::Navigate(NavigateError::Timeout {
			url: "https://example.test/".to_string(),
			ms: 100,
		});
		let body = failure_body(&err);

		assert_eq!(body["ok"], json!(false));
		assert_eq!(body["error"], json!("Failed to scrape article"));
		assert_eq!(body["name"], json!("navigation_timeout"));
		assert!(body["detail"].as_str().unwrap().contains("100ms"));
	}

	#[test]
	fn stack_is_capped_at_five_lines() {
		let err = ScrapeError::Navigate(NavigateError::Load {
			url: "https://example.test/".to_string(),
			source: "connection reset".into(),
		});
		let lines = stack_lines(&err);
		assert!(lines.len() <= 5);
		assert!(lines[0].contains("navigation failed"));
		assert!(lines[1].contains("connection reset"));
	}
}
