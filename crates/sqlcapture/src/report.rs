//! Fixed-width text reports over an aggregated session.
//!
//! ```text
//! == NOTE: duration measures time between 2 captures, it is not actual DB execution time.
//! == Totally captured 3 statement(s) in 0.0060 s:
//!   1. 0.0010 INSERT INTO users (name) VALUES (?)
//!      <- 'joe'
//!   2. 0.0030 SELECT FROM users WHERE users.id = ?
//!      <- '1'
//!   3. 0.0020 DELETE FROM users WHERE users.id = ?
//!      <- '1'
//! -- Slowest (top 20):
//!       2.   0.003 s  SELECT FROM users WHERE users.id = ?
//!     ...
//! -- By sql command:
//!     SELECT               1   0.003 s
//!     ...
//! ```

use crate::aggregate::{Aggregator, Dimension, StatGroup};
use crate::config::CaptureConfig;
use crate::error::CaptureResult;
use crate::session::CapturedStatement;
use crate::truncate_chars;
use std::fmt::Write as _;

/// First line of every non-empty report.
pub const DURATION_NOTE: &str =
    "== NOTE: duration measures time between 2 captures, it is not actual DB execution time.";

/// Report text for a session without statements.
pub const EMPTY_REPORT: &str = "No sql statements captured";

/// Narrowest key column, before padding.
const MIN_KEY_WIDTH: usize = 15;
const KEY_PADDING: usize = 3;
const BLOCK_INDENT: &str = "    ";

/// Numeric column of a stat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    /// `%3d`
    Count,
    /// `%7.3f s`
    Duration,
}

impl StatField {
    /// Count followed by duration.
    pub const ALL: [StatField; 2] = [StatField::Count, StatField::Duration];

    fn render(&self, group: &StatGroup<'_>) -> String {
        match self {
            StatField::Count => format!("{:>3}", group.count),
            StatField::Duration => format!("{:>7.3} s", group.total_duration_seconds()),
        }
    }
}

/// Builds report text from an [`Aggregator`].
#[derive(Debug, Clone, Copy)]
pub struct Reporter<'s, 'c> {
    aggregator: Aggregator<'s>,
    config: &'c CaptureConfig,
}

impl<'s, 'c> Reporter<'s, 'c> {
    pub fn new(aggregator: Aggregator<'s>, config: &'c CaptureConfig) -> Self {
        Self { aggregator, config }
    }

    /// The full report: header, statement listing, slowest block and one
    /// block per dimension.
    pub fn report(&self) -> CaptureResult<String> {
        let session = self.aggregator.session();
        if session.statement_count() == 0 {
            return Ok(EMPTY_REPORT.to_string());
        }

        let top = self.config.top_n;
        let mut out = String::new();
        let _ = writeln!(out, "{DURATION_NOTE}");
        let _ = writeln!(
            out,
            "== Totally captured {} statement(s) in {:.4} s:",
            session.statement_count(),
            session.total_duration().unwrap_or_default().as_secs_f64()
        );
        let _ = writeln!(out, "{}", self.statement_listing(self.config.verbose));
        let _ = writeln!(out, "-- Slowest (top {top}):");
        let _ = writeln!(out, "{BLOCK_INDENT}{}", self.slowest_block(top)?);
        for dimension in Dimension::ALL {
            let _ = writeln!(out, "{}", block_title(dimension, top));
            let _ = writeln!(
                out,
                "{BLOCK_INDENT}{}",
                self.stats_block(dimension, top, &StatField::ALL)
            );
        }
        Ok(out)
    }

    /// One numbered entry per statement, short or verbose form.
    pub fn statement_listing(&self, verbose: bool) -> String {
        self.aggregator
            .session()
            .iter()
            .map(|stmt| {
                let body = if verbose {
                    format_verbose(stmt)
                } else {
                    format_short(stmt, self.config.max_display_len)
                };
                format!("{:>3}. {}", stmt.sequence_index(), body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The `top_n` slowest statements, one per line.
    pub fn slowest_block(&self, top_n: usize) -> CaptureResult<String> {
        let lines: Vec<String> = self
            .aggregator
            .slowest(top_n)?
            .iter()
            .filter_map(|group| group.representative)
            .map(|stmt| {
                format!(
                    "{:>3}. {:>7.3} s  {}",
                    stmt.sequence_index(),
                    stmt.duration_seconds().unwrap_or_default(),
                    flatten(truncate_chars(stmt.display_text(), self.config.max_display_len))
                )
            })
            .collect();
        Ok(lines.join(&format!("\n{BLOCK_INDENT}")))
    }

    /// Stat lines for `dimension`, the key column sized to the longest key shown.
    pub fn stats_block(&self, dimension: Dimension, top_n: usize, fields: &[StatField]) -> String {
        format_stat_lines(&self.aggregator.group_by(dimension, top_n), fields)
    }

    /// Count-only stat lines.
    pub fn counts_block(&self, dimension: Dimension, top_n: usize) -> String {
        self.stats_block(dimension, top_n, &[StatField::Count])
    }
}

fn block_title(dimension: Dimension, top: usize) -> String {
    match dimension {
        Dimension::Kind => "-- By sql command:".to_string(),
        Dimension::Table => format!("-- By table (top {top}):"),
        Dimension::KindAndTable => format!("-- By sql command + table (top {top}):"),
    }
}

/// Lines joined for a block indented by four spaces.
pub fn format_stat_lines(groups: &[StatGroup<'_>], fields: &[StatField]) -> String {
    let key_width = groups
        .iter()
        .map(|g| g.group_key.chars().count())
        .fold(MIN_KEY_WIDTH, usize::max)
        + KEY_PADDING;

    groups
        .iter()
        .map(|group| {
            let mut line = format!("{:<key_width$}", group.group_key);
            for field in fields {
                line.push(' ');
                line.push_str(&field.render(group));
            }
            line
        })
        .collect::<Vec<_>>()
        .join(&format!("\n{BLOCK_INDENT}"))
}

/// `0.0012 SELECT FROM users` plus a `<- 'a+b'` line when values are bound.
pub fn format_short(stmt: &CapturedStatement, max_len: usize) -> String {
    let mut out = format!(
        "{:.4} {}",
        stmt.duration_seconds().unwrap_or_default(),
        flatten(truncate_chars(stmt.display_text(), max_len))
    );
    let params = stmt.parameters();
    if !params.is_empty() {
        let quoted = format!("'{}'", params.joined());
        let _ = write!(out, "\n     <- {}", truncate_chars(&quoted, max_len));
    }
    out
}

/// Untruncated form with classification, batch flag and JSON parameters.
pub fn format_verbose(stmt: &CapturedStatement) -> String {
    let mut out = format!(
        "{:.4} [{}]{} {}",
        stmt.duration_seconds().unwrap_or_default(),
        stmt.kind_and_table(),
        if stmt.is_batch() { " (batch)" } else { "" },
        stmt.raw_text()
    );
    let params = stmt.parameters();
    if !params.is_empty() {
        let _ = write!(out, "\n     <- {}", params.to_json());
    }
    out
}

fn flatten(text: &str) -> String {
    text.replace('\n', " ")
}
