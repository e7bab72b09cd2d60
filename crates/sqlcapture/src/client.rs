//! Database client abstraction and the hook-running client wrapper.

use crate::error::{CaptureError, CaptureResult};
use crate::hook::{HookHandle, HookRegistry, StatementEvent, StatementHook};
use crate::params::Parameters;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = CaptureResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Returns `CaptureError::NotFound` if no rows are returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = CaptureResult<Row>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = CaptureResult<Option<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = CaptureResult<u64>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        let rows = GenericClient::query(self, sql, params).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CaptureError::not_found("Expected one row, got none"))
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        let rows = GenericClient::query(self, sql, params).await?;
        Ok(rows.into_iter().next())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        let rows = GenericClient::query(self, sql, params).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CaptureError::not_found("Expected one row, got none"))
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        let rows = GenericClient::query(self, sql, params).await?;
        Ok(rows.into_iter().next())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }
}

/// A client wrapper that runs registered [`StatementHook`]s before every statement.
///
/// Hooks run in registration order on the task that issues the statement. The
/// hook list is snapshotted per statement, so a hook may register or remove
/// hooks without deadlocking.
pub struct HookedClient<C> {
    client: C,
    hooks: RwLock<Vec<(HookHandle, Arc<dyn StatementHook>)>>,
    next_id: AtomicU64,
}

impl<C> HookedClient<C> {
    /// Wrap a client with no hooks registered.
    pub fn new(client: C) -> Self {
        Self {
            client,
            hooks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Get the inner client, consuming this wrapper.
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Run every registered hook for `event`, stopping at the first error.
    pub fn fire(&self, event: &StatementEvent) -> CaptureResult<()> {
        let hooks: Vec<Arc<dyn StatementHook>> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        hooks.iter().try_for_each(|hook| hook.before_execute(event))
    }
}

impl<C> HookRegistry for HookedClient<C> {
    fn register(&self, hook: Arc<dyn StatementHook>) -> HookHandle {
        let handle = HookHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, hook));
        tracing::debug!(target: "sqlcapture", %handle, "hook registered");
        handle
    }

    fn unregister(&self, handle: HookHandle) -> CaptureResult<()> {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let pos = hooks
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(CaptureError::HookNotRegistered(handle))?;
        hooks.remove(pos);
        tracing::debug!(target: "sqlcapture", %handle, "hook removed");
        Ok(())
    }
}

impl<C: GenericClient> HookedClient<C> {
    /// Execute `sql` once per parameter row.
    ///
    /// Hooks fire a single time with `is_batch` set and one array of values per
    /// row. Returns the total number of affected rows.
    pub async fn execute_many(
        &self,
        sql: &str,
        param_sets: &[&[&(dyn ToSql + Sync)]],
    ) -> CaptureResult<u64> {
        let rows = param_sets
            .iter()
            .map(|params| Parameters::from_sql_params(params).to_json())
            .collect();
        self.fire(&StatementEvent::new(sql, Parameters::Positional(rows)).batch())?;

        let mut affected = 0u64;
        for params in param_sets {
            affected = affected.saturating_add(self.client.execute(sql, params).await?);
        }
        Ok(affected)
    }

    fn fire_for(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<()> {
        self.fire(&StatementEvent::new(sql, Parameters::from_sql_params(params)))
    }
}

impl<C: GenericClient> GenericClient for HookedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        self.fire_for(sql, params)?;
        self.client.query(sql, params).await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        self.fire_for(sql, params)?;
        self.client.query_one(sql, params).await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CaptureResult<Option<Row>> {
        self.fire_for(sql, params)?;
        self.client.query_opt(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        self.fire_for(sql, params)?;
        self.client.execute(sql, params).await
    }
}
