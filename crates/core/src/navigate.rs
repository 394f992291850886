//! Timeout-bounded navigation.

use std::time::Duration;

use url::Url;

use crate::config::WaitUntil;
use crate::error::NavigateError;
use crate::session::Session;

/// Drives a session to a target URL under a hard time budget.
#[derive(Debug, Clone)]
pub struct Navigator {
	wait_until: WaitUntil,
	settle_delay: Duration,
}

impl Navigator {
	pub fn new(wait_until: WaitUntil, settle_delay: Duration) -> Self {
		Self {
			wait_until,
			settle_delay,
		}
	}

	/// Loads `target`, failing with a timeout error when the load
	/// condition is not reached within `budget`. On expiry the in-flight
	/// navigation future is dropped, aborting its await; other sessions
	/// and the shared engine are unaffected.
	///
	/// After the load condition a settle delay is applied so common
	/// client-side content injection can finish. Heuristic, not a
	/// guarantee: pages that inject later than the delay yield truncated
	/// text.
	pub async fn load(
		&self,
		session: &mut Session,
		target: &Url,
		budget: Duration,
	) -> Result<(), NavigateError> {
		match tokio::time::timeout(budget, session.goto(target.as_str(), self.wait_until)).await {
			Ok(Ok(())) => {}
			Ok(Err(err)) => return Err(err),
			Err(_) => {
				return Err(NavigateError::Timeout {
					url: target.to_string(),
					ms: budget.as_millis() as u64,
				});
			}
		}

		if !self.settle_delay.is_zero() {
			tokio::time::sleep(self.settle_delay).await;
		}
		Ok(())
	}
}
