//! A single stealth headless-browser session, reused across every document
//! of one bill's acquisition run (spec.md §4.1).

pub mod error;
pub mod retry;
pub mod session;
pub mod stealth;

pub use error::Error;
pub use retry::{backoff_delay, retry_with_backoff};
pub use session::BrowserSession;
