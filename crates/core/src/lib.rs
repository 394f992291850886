//! Browser-rendered article text extraction.
//!
//! One long-lived Chromium engine is shared by every request. Each request
//! gets its own isolated browsing session, a timeout-bounded navigation,
//! and an ordered-candidate extraction pass over the rendered document.
//! The engine is started at most once concurrently and survives request
//! failures; sessions never outlive the request that opened them.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod navigate;
pub mod scrape;
pub mod session;

pub use config::{EngineConfig, ScrapeConfig, SessionOptions, WaitUntil};
pub use engine::{ChromiumLauncher, Engine, EngineHandle, EngineLauncher, Surface};
pub use error::{EngineError, NavigateError, Result, ScrapeError, SessionError};
pub use extract::Extractor;
pub use navigate::Navigator;
pub use scrape::{Extraction, Scraper};
pub use session::{Session, SessionFactory};
