//! Scoped capture bound to a hook registry.

use crate::clock::{Clock, SystemClock};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::hook::{HookHandle, HookRegistry, StatementEvent, StatementHook};
use crate::session::CaptureSession;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type SharedSession = Arc<Mutex<Option<CaptureSession>>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, Option<CaptureSession>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds intercepted statements into the shared session.
struct SessionHook {
    session: SharedSession,
}

impl StatementHook for SessionHook {
    fn before_execute(&self, event: &StatementEvent) -> CaptureResult<()> {
        let mut guard = lock(&self.session);
        let session = guard.as_mut().ok_or(CaptureError::SessionClosed)?;
        session.on_statement(event.sql.clone(), event.parameters.clone(), event.is_batch)?;
        Ok(())
    }
}

/// An active capture window on a [`HookRegistry`].
///
/// Created with [`Capture::start`]; every statement the registry executes
/// until [`Capture::finish`] is recorded. Dropping an unfinished capture
/// finishes it, so a scope left early through `?` or a panic still removes
/// the hook exactly once.
///
/// ```rust,ignore
/// let client = HookedClient::new(pg_client);
/// let capture = Capture::start(&client);
/// client.execute("UPDATE users SET active = false", &[]).await?;
/// let session = capture.finish()?;
/// println!("{}", session.report()?);
/// ```
pub struct Capture<'r, R: HookRegistry + ?Sized> {
    registry: &'r R,
    handle: Option<HookHandle>,
    session: SharedSession,
}

impl<'r, R: HookRegistry + ?Sized> Capture<'r, R> {
    /// Start capturing with the default configuration.
    pub fn start(registry: &'r R) -> Self {
        Self::start_with(registry, CaptureConfig::default(), Arc::new(SystemClock))
    }

    /// Start capturing with the given configuration and clock.
    pub fn start_with(registry: &'r R, config: CaptureConfig, clock: Arc<dyn Clock>) -> Self {
        let session: SharedSession = Arc::new(Mutex::new(Some(CaptureSession::with_clock(
            config, clock,
        ))));
        let handle = registry.register(Arc::new(SessionHook {
            session: Arc::clone(&session),
        }));
        Self {
            registry,
            handle: Some(handle),
            session,
        }
    }

    /// Statements captured so far.
    pub fn statement_count(&self) -> usize {
        lock(&self.session)
            .as_ref()
            .map_or(0, CaptureSession::statement_count)
    }

    /// Remove the hook and return the finished session.
    pub fn finish(mut self) -> CaptureResult<CaptureSession> {
        self.finish_inner()
    }

    fn finish_inner(&mut self) -> CaptureResult<CaptureSession> {
        let handle = self.handle.take().ok_or(CaptureError::AlreadyFinished)?;
        let unregistered = self.registry.unregister(handle);

        let mut session = lock(&self.session)
            .take()
            .ok_or(CaptureError::AlreadyFinished)?;
        session.finish()?;
        unregistered?;
        Ok(session)
    }
}

impl<R: HookRegistry + ?Sized> Drop for Capture<'_, R> {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if let Err(err) = self.finish_inner() {
            tracing::warn!(target: "sqlcapture", error = %err, "implicit capture finish failed");
        }
    }
}
