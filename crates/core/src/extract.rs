//! Ordered-candidate article text extraction.
//!
//! Walks a priority-ordered list of document regions and accepts the
//! first one whose rendered text is long enough to be real content rather
//! than navigation chrome. Heuristic ranking: a non-article region over
//! the threshold or a true article under it are accepted trade-offs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::session::Session;

/// One ranked document region: a selector plus the minimum normalized
/// text length it must produce to be accepted.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
	pub selector: &'static str,
	pub min_len: usize,
}

/// Selector priority order: semantic article, main-role region, generic
/// main, structured-data article body, then "content"/"article" classed
/// regions.
const SELECTORS: [&str; 6] = [
	"article",
	"[role=\"main\"]",
	"main",
	"[itemprop=\"articleBody\"]",
	"[class*=\"content\"], [id*=\"content\"]",
	"[class*=\"article\"], [id*=\"article\"]",
];

/// Picks the best text region of a loaded document.
pub struct Extractor {
	min_text_len: usize,
}

impl Extractor {
	/// `min_text_len` filters out boilerplate regions that match a
	/// selector but carry no real content.
	pub fn new(min_text_len: usize) -> Self {
		Self { min_text_len }
	}

	/// Ranked candidate list, rebuilt per extraction.
	fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
		SELECTORS.iter().copied().map(|selector| Candidate {
			selector,
			min_len: self.min_text_len,
		})
	}

	/// Returns the best-candidate text, or the whole-body text when no
	/// region qualifies, even if short or empty.
	///
	/// Never fails: evaluation errors degrade to the next candidate, and
	/// ultimately to an empty string, with a warning.
	pub async fn extract(&self, session: &mut Session) -> String {
		for candidate in self.candidates() {
			match session.inner_text(candidate.selector).await {
				Ok(Some(text)) => {
					let text = normalize(&text);
					if text.chars().count() >= candidate.min_len {
						return text;
					}
				}
				Ok(None) => {}
				Err(err) => {
					warn!(
						target = "gist.extract",
						selector = candidate.selector,
						error = %err,
						"candidate evaluation failed"
					);
				}
			}
		}

		match session.inner_text("body").await {
			Ok(Some(text)) => normalize(&text),
			Ok(None) => String::new(),
			Err(err) => {
				warn!(target = "gist.extract", error = %err, "body fallback evaluation failed");
				String::new()
			}
		}
	}
}

/// Collapses whitespace runs preceding newlines and trims the ends.
pub fn normalize(text: &str) -> String {
	static TRAILING_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
	TRAILING_WS.replace_all(text, "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use async_trait::async_trait;

	use super::*;
	use crate::config::WaitUntil;
	use crate::engine::Surface;
	use crate::error::{NavigateError, SessionError};

	/// Surface backed by a selector → text map.
	#[derive(Default)]
	struct MappedSurface {
		regions: HashMap<&'static str, String>,
		failing: Option<&'static str>,
	}

	impl MappedSurface {
		fn with(mut self, selector: &'static str, text: impl Into<String>) -> Self {
			self.regions.insert(selector, text.into());
			self
		}

		fn failing_on(mut self, selector: &'static str) -> Self {
			self.failing = Some(selector);
			self
		}
	}

	#[async_trait]
	impl Surface for MappedSurface {
		async fn goto(&mut self, _url: &str, _wait: WaitUntil) -> Result<(), NavigateError> {
			Ok(())
		}

		async fn inner_text(&mut self, selector: &str) -> Result<Option<String>, SessionError> {
			if self.failing == Some(selector) {
				return Err(SessionError::Eval("target crashed".to_string()));
			}
			Ok(self.regions.get(selector).cloned())
		}

		async fn close(&mut self) -> Result<(), SessionError> {
			Ok(())
		}
	}

	fn session(surface: MappedSurface) -> Session {
		Session::new(Box::new(surface), None)
	}

	fn long_text(seed: &str) -> String {
		seed.repeat(400)
	}

	#[tokio::test]
	async fn article_region_outranks_content_classed_region() {
		let mut session = session(
			MappedSurface::default()
				.with("article", long_text("a"))
				.with("[class*=\"content\"], [id*=\"content\"]", long_text("c")),
		);

		let text = Extractor::new(400).extract(&mut session).await;
		assert_eq!(text, long_text("a"));
		session.close().await;
	}

	#[tokio::test]
	async fn short_candidates_fall_back_to_body_even_when_body_is_short() {
		let mut session = session(
			MappedSurface::default()
				.with("article", "too short")
				.with("body", "body text"),
		);

		let text = Extractor::new(400).extract(&mut session).await;
		assert_eq!(text, "body text");
		session.close().await;
	}

	#[tokio::test]
	async fn empty_document_yields_empty_string() {
		let mut session = session(MappedSurface::default());
		let text = Extractor::new(400).extract(&mut session).await;
		assert_eq!(text, "");
		session.close().await;
	}

	#[tokio::test]
	async fn failing_candidate_is_skipped_not_fatal() {
		let mut session = session(
			MappedSurface::default()
				.failing_on("article")
				.with("main", long_text("m")),
		);

		let text = Extractor::new(400).extract(&mut session).await;
		assert_eq!(text, long_text("m"));
		session.close().await;
	}

	#[tokio::test]
	async fn qualifying_length_is_measured_after_normalization() {
		// 400 chars of padding collapse away, leaving a short region.
		let padded = format!("x   \n{}", " ".repeat(400));
		let mut session = session(
			MappedSurface::default()
				.with("article", padded)
				.with("body", "fallback"),
		);

		let text = Extractor::new(400).extract(&mut session).await;
		assert_eq!(text, "fallback");
		session.close().await;
	}

	#[test]
	fn normalize_collapses_whitespace_before_newlines_and_trims() {
		assert_eq!(normalize("a   \nb\t\t\nc"), "a\nb\nc");
		assert_eq!(normalize("  padded  "), "padded");
		assert_eq!(normalize(""), "");
	}
}
