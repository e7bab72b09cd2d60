use crate::client::GenericClient;
use crate::clock::ManualClock;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::params::Parameters;
use crate::session::CaptureSession;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A finished session where each `(sql, millis)` entry lasted `millis`.
pub(crate) fn finished_session(entries: &[(&str, u64)]) -> CaptureSession {
    let with_params: Vec<_> = entries
        .iter()
        .map(|(sql, ms)| (*sql, Parameters::none(), *ms))
        .collect();
    finished_session_with(&with_params)
}

pub(crate) fn finished_session_with(entries: &[(&str, Parameters, u64)]) -> CaptureSession {
    let clock = Arc::new(ManualClock::default());
    let mut session = CaptureSession::with_clock(CaptureConfig::default(), clock.clone());
    for (sql, params, ms) in entries {
        session.on_statement(*sql, params.clone(), false).unwrap();
        clock.advance(Duration::from_millis(*ms));
    }
    session.finish().unwrap();
    session
}

/// Client that returns no rows and counts executions.
#[derive(Debug, Default)]
pub(crate) struct DummyClient {
    executed: AtomicUsize,
}

impl DummyClient {
    pub(crate) fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl GenericClient for DummyClient {
    async fn query(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn query_one(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        Err(CaptureError::not_found("DummyClient has no rows"))
    }

    async fn query_opt(
        &self,
        _sql: &str,
        _params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        Ok(None)
    }

    async fn execute(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}
