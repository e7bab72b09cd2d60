//! # sqlcapture
//!
//! Capture the SQL statements a Postgres client executes during a window of
//! application code, then classify, rank and summarize them.
//!
//! ## Features
//!
//! - **Scoped capture**: `Capture::start` registers a hook, `finish` (or drop) removes it
//! - **Classification**: every statement gets a kind, a target table and a display text
//! - **Aggregation**: group by kind, table or both; rank individual statements by duration
//! - **Reports**: fixed-width text suitable for test logs and terminals
//! - **Hooks**: `HookedClient` runs `StatementHook`s before each statement, `TracingHook` logs them
//!
//! Durations are the wall-clock gap between two successive interceptions. They
//! include driver and application time and are not server execution time.
//!
//! ## Example
//!
//! ```ignore
//! use sqlcapture::{Capture, Dimension, GenericClient, HookedClient};
//!
//! let client = HookedClient::new(pg_client);
//! let capture = Capture::start(&client);
//! client.query("SELECT * FROM users WHERE id = $1", &[&1i64]).await?;
//! client.execute("UPDATE users SET seen = now()", &[]).await?;
//! let session = capture.finish()?;
//!
//! assert_eq!(session.counts(Dimension::Kind)?["SELECT"], 1);
//! println!("{}", session.report()?);
//! ```

pub mod aggregate;
pub mod capture;
pub mod classify;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod hook;
pub mod params;
pub mod report;
pub mod session;

#[cfg(test)]
mod test_support;

pub use aggregate::{Aggregator, Dimension, StatGroup};
pub use capture::Capture;
pub use classify::{Classification, UNKNOWN_TABLE, classify};
pub use client::{GenericClient, HookedClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use hook::{
    CompositeHook, HookHandle, HookRegistry, StatementEvent, StatementHook, TracingHook,
};
pub use params::Parameters;
pub use report::{Reporter, StatField};
pub use session::{CaptureSession, CapturedStatement, SessionState};

/// Longest prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
