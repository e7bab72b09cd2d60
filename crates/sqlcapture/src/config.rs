use std::time::Duration;

/// Default number of rows in grouped and slowest report blocks.
pub const TOP_DEFAULT: usize = 20;

/// Default truncation of statement and parameter text in short listings.
pub const DISPLAY_LEN_DEFAULT: usize = 70;

/// Configuration for a capture session and its reports.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rows kept per grouping block and in the slowest block.
    pub top_n: usize,
    /// Print the verbose per-statement form instead of the short one.
    pub verbose: bool,
    /// Maximum characters of statement / parameter text in the short form.
    pub max_display_len: usize,
    /// Gaps longer than this are logged as slow statements. `None` disables it.
    pub slow_statement_threshold: Option<Duration>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            top_n: TOP_DEFAULT,
            verbose: false,
            max_display_len: DISPLAY_LEN_DEFAULT,
            slow_statement_threshold: None,
        }
    }
}

impl CaptureConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many rows the report blocks keep.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// List statements in verbose form.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Set the truncation length for the short per-statement form.
    pub fn with_max_display_len(mut self, len: usize) -> Self {
        self.max_display_len = len;
        self
    }

    /// Set the slow statement threshold.
    ///
    /// A statement whose capture gap exceeds this duration emits a `warn` event.
    pub fn with_slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold = Some(threshold);
        self
    }
}
