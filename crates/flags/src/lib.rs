//! Typed HTTP client for the remote feature-flag evaluation service.
//!
//! The server asks this crate two questions: which boolean variation a
//! context should see (`variation`), and "this context converted"
//! (`track`). Both degrade instead of failing — a flag service outage must
//! never take a page down.

pub mod client;
pub mod overrides;

pub use client::{FlagsClient, FlagsConfig};
pub use flagboard_api::FlagContext;
pub use overrides::load_overrides;

/// Errors from the flag service client. Callers of `variation`/`track`
/// never see these — they are logged and swallowed — but the constructors
/// and the override-file loader surface them.
#[derive(Debug, thiserror::Error)]
pub enum FlagsError {
    #[error("flag service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("flag service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid flag override file: {0}")]
    Overrides(String),
}
