use gist::Scraper;

/// Shared handler state.
pub struct AppState {
	pub scraper: Scraper,
}
