use crate::classify::classify;
use crate::clock::elapsed_between;
use crate::params::Parameters;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// One recorded statement execution.
///
/// Classification is computed on construction and never changes. The end
/// time and duration are set exactly once, when the next statement arrives or
/// the session finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedStatement {
    sequence_index: usize,
    raw_text: String,
    parameters: Parameters,
    is_batch: bool,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration: Option<Duration>,
    kind: String,
    target_table: String,
    display_text: String,
}

impl CapturedStatement {
    pub(crate) fn new(
        sequence_index: usize,
        raw_text: String,
        parameters: Parameters,
        is_batch: bool,
        start_time: DateTime<Utc>,
    ) -> Self {
        let classification = classify(&raw_text);
        Self {
            sequence_index,
            raw_text,
            parameters,
            is_batch,
            start_time,
            end_time: None,
            duration: None,
            kind: classification.kind,
            target_table: classification.target_table,
            display_text: classification.display_text,
        }
    }

    /// Set the end time. Returns the derived duration, or `None` if the
    /// statement was already closed.
    pub(crate) fn close(&mut self, end_time: DateTime<Utc>) -> Option<Duration> {
        if self.end_time.is_some() {
            return None;
        }
        let duration = elapsed_between(self.start_time, end_time);
        self.end_time = Some(end_time);
        self.duration = Some(duration);
        Some(duration)
    }

    /// 1-based position within the session.
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    /// Statement text exactly as received.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Whether this execution was a batched (multi-row) operation.
    pub fn is_batch(&self) -> bool {
        self.is_batch
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Gap until the next capture event. `None` until the end time is known.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn kind_and_table(&self) -> String {
        format!("{} {}", self.kind, self.target_table)
    }
}
