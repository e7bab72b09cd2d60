//! Grouping and ranking over a finished capture session.

use crate::error::{CaptureError, CaptureResult};
use crate::session::{CaptureSession, CapturedStatement};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The classification value(s) statements are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Statement kind (`SELECT`, `INSERT`, ...).
    Kind,
    /// Target table.
    Table,
    /// Kind and table, joined by a single space.
    KindAndTable,
}

impl Dimension {
    /// All dimensions in report order.
    pub const ALL: [Dimension; 3] = [Dimension::Kind, Dimension::Table, Dimension::KindAndTable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Kind => "kind",
            Dimension::Table => "table",
            Dimension::KindAndTable => "kind_and_table",
        }
    }

    /// Group key of `stmt` along this dimension.
    pub fn key(&self, stmt: &CapturedStatement) -> String {
        match self {
            Dimension::Kind => stmt.kind().to_string(),
            Dimension::Table => stmt.target_table().to_string(),
            Dimension::KindAndTable => stmt.kind_and_table(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = CaptureError;

    /// Accepts `kind`, `table`, `kind_and_table` and the `by_type`,
    /// `by_table`, `by_type_and_table` aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kind" | "by_kind" | "by_type" => Ok(Dimension::Kind),
            "table" | "by_table" => Ok(Dimension::Table),
            "kind_and_table" | "by_kind_and_table" | "by_type_and_table" => {
                Ok(Dimension::KindAndTable)
            }
            _ => Err(CaptureError::InvalidDimension(s.to_string())),
        }
    }
}

/// One aggregation row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatGroup<'s> {
    /// Dimension value(s) as display text.
    pub group_key: String,
    /// Number of statements in the group.
    pub count: usize,
    /// Sum of member durations.
    pub total_duration: Duration,
    /// The slowest member (for grouped rows) or the statement itself (for slowest rows).
    pub representative: Option<&'s CapturedStatement>,
}

impl<'s> StatGroup<'s> {
    fn empty(group_key: String) -> Self {
        Self {
            group_key,
            count: 0,
            total_duration: Duration::ZERO,
            representative: None,
        }
    }

    fn single(stmt: &'s CapturedStatement) -> Self {
        Self {
            group_key: stmt.kind_and_table(),
            count: 1,
            total_duration: stmt.duration().unwrap_or_default(),
            representative: Some(stmt),
        }
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration.as_secs_f64()
    }
}

/// Read-only aggregation view. Only obtainable for a finished session.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'s> {
    session: &'s CaptureSession,
}

impl<'s> Aggregator<'s> {
    pub(crate) fn new(session: &'s CaptureSession) -> CaptureResult<Self> {
        if !session.is_finished() {
            return Err(CaptureError::NotFinished);
        }
        Ok(Self { session })
    }

    pub fn session(&self) -> &'s CaptureSession {
        self.session
    }

    pub fn statement_count(&self) -> usize {
        self.session.statement_count()
    }

    /// Sum of all statement durations.
    pub fn total_duration(&self) -> Duration {
        self.session
            .iter()
            .filter_map(CapturedStatement::duration)
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// One group per distinct value of `dimension`, ordered by total duration
    /// then count (both descending), truncated to `top_n`.
    ///
    /// Groups that tie on both keep the order in which they were first seen.
    pub fn group_by(&self, dimension: Dimension, top_n: usize) -> Vec<StatGroup<'s>> {
        let mut groups: Vec<StatGroup<'s>> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for stmt in self.session.iter() {
            let key = dimension.key(stmt);
            let slot = match slots.get(&key) {
                Some(&slot) => slot,
                None => {
                    slots.insert(key.clone(), groups.len());
                    groups.push(StatGroup::empty(key));
                    groups.len() - 1
                }
            };

            let duration = stmt.duration().unwrap_or_default();
            let group = &mut groups[slot];
            group.count += 1;
            group.total_duration = group.total_duration.saturating_add(duration);
            if group
                .representative
                .is_none_or(|r| duration > r.duration().unwrap_or_default())
            {
                group.representative = Some(stmt);
            }
        }

        groups.sort_by(|a, b| {
            b.total_duration
                .cmp(&a.total_duration)
                .then_with(|| b.count.cmp(&a.count))
        });
        groups.truncate(top_n);
        groups
    }

    /// [`Aggregator::group_by`] with the dimension given by name.
    pub fn group_by_name(&self, dimension: &str, top_n: usize) -> CaptureResult<Vec<StatGroup<'s>>> {
        Ok(self.group_by(dimension.parse()?, top_n))
    }

    /// The `top_n` individual statements by duration, longest first; equal
    /// durations keep capture order.
    pub fn slowest(&self, top_n: usize) -> CaptureResult<Vec<StatGroup<'s>>> {
        let mut ranked: Vec<(usize, Duration)> = self
            .session
            .iter()
            .map(|s| (s.sequence_index(), s.duration().unwrap_or_default()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        ranked
            .into_iter()
            .take(top_n)
            .map(|(index, _)| self.session.statement(index).map(StatGroup::single))
            .collect()
    }

    /// Statement count per group key, without truncation.
    pub fn counts(&self, dimension: Dimension) -> BTreeMap<String, usize> {
        self.group_by(dimension, usize::MAX)
            .into_iter()
            .map(|g| (g.group_key, g.count))
            .collect()
    }
}
