//! Capture session state machine and captured statement records.
//!
//! A session starts `Active`, records statements in arrival order and moves
//! once to `Finished`. Statement durations are the wall-clock gap between two
//! successive interception events (or between the last event and finish).
//! That gap includes driver, network and application time on the capturing
//! thread, so it is not server-side execution time.

mod statement;

#[cfg(test)]
mod tests;

pub use statement::CapturedStatement;

use crate::aggregate::{Aggregator, Dimension, StatGroup};
use crate::clock::{Clock, SystemClock, elapsed_between};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::params::Parameters;
use crate::report::Reporter;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Recording statements.
    Active,
    /// Terminal; statement data is complete and immutable.
    Finished,
}

/// An ordered, append-only record of the statements seen during one capture window.
pub struct CaptureSession {
    clock: Arc<dyn Clock>,
    config: CaptureConfig,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    statements: Vec<CapturedStatement>,
}

impl CaptureSession {
    /// Start a session with the default configuration and the system clock.
    pub fn new() -> Self {
        Self::with_config(CaptureConfig::default())
    }

    /// Start a session with the system clock.
    pub fn with_config(config: CaptureConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Start a session reading timestamps from `clock`.
    pub fn with_clock(config: CaptureConfig, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        tracing::debug!(target: "sqlcapture", %started_at, "capture session started");
        Self {
            clock,
            config,
            started_at,
            finished_at: None,
            statements: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.finished_at.is_some() {
            SessionState::Finished
        } else {
            SessionState::Active
        }
    }

    /// Whether `finish()` has been called.
    pub fn is_finished(&self) -> bool {
        self.state() == SessionState::Finished
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Record a statement that is about to execute.
    ///
    /// Closes the previous statement's timing at the same instant. Returns the
    /// new statement's 1-based sequence index.
    pub fn on_statement(
        &mut self,
        raw_text: impl Into<String>,
        parameters: Parameters,
        is_batch: bool,
    ) -> CaptureResult<usize> {
        if self.is_finished() {
            return Err(CaptureError::SessionClosed);
        }

        let now = self.clock.now();
        self.close_last(now);

        let sequence_index = self.statements.len() + 1;
        let stmt = CapturedStatement::new(sequence_index, raw_text.into(), parameters, is_batch, now);
        tracing::trace!(
            target: "sqlcapture",
            sequence_index,
            kind = stmt.kind(),
            table = stmt.target_table(),
            is_batch,
            "statement captured"
        );
        self.statements.push(stmt);
        Ok(sequence_index)
    }

    /// End the capture window.
    ///
    /// The last statement's timing is closed at the finish instant.
    pub fn finish(&mut self) -> CaptureResult<()> {
        if self.is_finished() {
            return Err(CaptureError::AlreadyFinished);
        }

        let now = self.clock.now();
        self.close_last(now);
        self.finished_at = Some(now);

        tracing::debug!(
            target: "sqlcapture",
            statements = self.statements.len(),
            total_duration = ?elapsed_between(self.started_at, now),
            "capture session finished"
        );
        Ok(())
    }

    /// Number of statements captured so far.
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Captured statements in capture order.
    pub fn statements(&self) -> &[CapturedStatement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CapturedStatement> {
        self.statements.iter()
    }

    /// Look up a statement by its 1-based sequence index.
    pub fn statement(&self, index: usize) -> CaptureResult<&CapturedStatement> {
        index
            .checked_sub(1)
            .and_then(|i| self.statements.get(i))
            .ok_or(CaptureError::RowIndexOutOfRange {
                index,
                count: self.statements.len(),
            })
    }

    /// Length of the whole capture window; `None` while active.
    pub fn total_duration(&self) -> Option<Duration> {
        self.finished_at
            .map(|finished| elapsed_between(self.started_at, finished))
    }

    /// Grouping and ranking over the finished session.
    pub fn aggregator(&self) -> CaptureResult<Aggregator<'_>> {
        Aggregator::new(self)
    }

    /// Statement count per group of `dimension`.
    pub fn counts(&self, dimension: Dimension) -> CaptureResult<BTreeMap<String, usize>> {
        Ok(self.aggregator()?.counts(dimension))
    }

    /// Groups of `dimension` ranked by total duration, keeping `top_n`.
    pub fn group_by(&self, dimension: Dimension, top_n: usize) -> CaptureResult<Vec<StatGroup<'_>>> {
        Ok(self.aggregator()?.group_by(dimension, top_n))
    }

    /// The `top_n` individual statements with the longest durations.
    pub fn slowest(&self, top_n: usize) -> CaptureResult<Vec<StatGroup<'_>>> {
        self.aggregator()?.slowest(top_n)
    }

    /// Full text report using the session's configuration.
    pub fn report(&self) -> CaptureResult<String> {
        Reporter::new(self.aggregator()?, &self.config).report()
    }

    fn close_last(&mut self, at: DateTime<Utc>) {
        let threshold = self.config.slow_statement_threshold;
        let Some(last) = self.statements.last_mut() else {
            return;
        };
        let Some(duration) = last.close(at) else {
            return;
        };
        if threshold.is_some_and(|t| duration > t) {
            tracing::warn!(
                target: "sqlcapture",
                sequence_index = last.sequence_index(),
                kind = last.kind(),
                table = last.target_table(),
                ?duration,
                "slow statement"
            );
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state())
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a CaptureSession {
    type Item = &'a CapturedStatement;
    type IntoIter = std::slice::Iter<'a, CapturedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
