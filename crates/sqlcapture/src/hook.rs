//! Statement interception hooks.
//!
//! A [`HookRegistry`] is anything that can run hooks synchronously right
//! before it sends a statement to the database. [`crate::HookedClient`] is
//! the registry provided for tokio-postgres clients.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlcapture::{HookedClient, HookRegistry, TracingHook};
//! use std::sync::Arc;
//!
//! let client = HookedClient::new(pg_client);
//! let handle = client.register(Arc::new(TracingHook::new()));
//! // ... queries are logged on target `sqlcapture.sql` ...
//! client.unregister(handle)?;
//! ```

use crate::classify::classify;
use crate::error::CaptureResult;
use crate::params::Parameters;
use crate::truncate_chars;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// What a hook sees of a statement about to execute.
#[derive(Debug, Clone)]
pub struct StatementEvent {
    /// The SQL text sent to the database.
    pub sql: String,
    /// Bound values.
    pub parameters: Parameters,
    /// Whether the statement runs once per parameter row.
    pub is_batch: bool,
}

impl StatementEvent {
    /// Create a single-execution event.
    pub fn new(sql: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            sql: sql.into(),
            parameters,
            is_batch: false,
        }
    }

    /// Mark the event as a batched execution.
    pub fn batch(mut self) -> Self {
        self.is_batch = true;
        self
    }
}

/// Hook invoked before each statement executes.
pub trait StatementHook: Send + Sync {
    /// Called synchronously before the statement is sent.
    ///
    /// Returning an error aborts the statement; the error is handed to the
    /// caller of the client method.
    fn before_execute(&self, event: &StatementEvent) -> CaptureResult<()>;
}

/// Identifies one registration in a [`HookRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub(crate) u64);

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration API of an intercepting database client.
pub trait HookRegistry {
    /// Add a hook. It sees every statement executed from now on.
    fn register(&self, hook: Arc<dyn StatementHook>) -> HookHandle;

    /// Remove a hook.
    ///
    /// Fails with [`crate::CaptureError::HookNotRegistered`] for a handle that
    /// was already removed.
    fn unregister(&self, handle: HookHandle) -> CaptureResult<()>;
}

/// A hook that runs multiple hooks in sequence, stopping at the first error.
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Arc<dyn StatementHook>>,
}

impl CompositeHook {
    /// Create an empty composite hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook.
    #[allow(clippy::should_implement_trait)]
    pub fn add<H: StatementHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Add an Arc-wrapped hook.
    pub fn add_arc(mut self, hook: Arc<dyn StatementHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl StatementHook for CompositeHook {
    fn before_execute(&self, event: &StatementEvent) -> CaptureResult<()> {
        self.hooks
            .iter()
            .try_for_each(|hook| hook.before_execute(event))
    }
}

/// A `tracing`-based debug hook that emits every intercepted statement.
///
/// Events go to target `sqlcapture.sql` with the statement's kind and table.
#[derive(Debug, Clone)]
pub struct TracingHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in chars). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingHook {
    /// Create a new hook with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.chars().count() > max => format!("{}...", truncate_chars(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl StatementHook for TracingHook {
    fn before_execute(&self, event: &StatementEvent) -> CaptureResult<()> {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let classification = classify(&event.sql);
        let sql = self.truncate_sql(&event.sql);
        emit_at_level!(
            self.level,
            target: "sqlcapture.sql",
            kind = %classification.kind,
            table = %classification.target_table,
            param_count = event.parameters.len(),
            is_batch = event.is_batch,
            sql = %sql,
        );
        Ok(())
    }
}
