//! Scheduler collaborator and the tokio-backed implementation

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use statefy_core::{StatefyError, StatefyResult};
use tokio::runtime::Handle;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs deferred work on behalf of the container
///
/// Implementations must contain failures: a task that panics must not
/// propagate back into the code that submitted it, nor prevent other
/// tasks from running. [`run_isolated`] does this for a single task.
pub trait Scheduler: Send + Sync {
    /// Run `task` asynchronously, at the next opportunity
    fn spawn(&self, task: Task);

    /// Run `task` once, after `delay` has elapsed
    fn delay(&self, delay: Duration, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn spawn(&self, task: Task) {
        (**self).spawn(task)
    }

    fn delay(&self, delay: Duration, task: Task) {
        (**self).delay(delay, task)
    }
}

/// Run a task, catching and logging any panic
/// Returns false if the task panicked
pub fn run_isolated(task: Task) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::warn!(panic = %panic_message(payload.as_ref()), "scheduled task panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Scheduler that submits work to a tokio runtime
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        TokioScheduler { handle }
    }

    /// Bind to the runtime the caller is currently running inside
    pub fn current() -> StatefyResult<Self> {
        let handle =
            Handle::try_current().map_err(|e| StatefyError::RuntimeUnavailable(e.to_string()))?;
        Ok(TokioScheduler { handle })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: Task) {
        self.handle.spawn(async move {
            run_isolated(task);
        });
    }

    fn delay(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            run_isolated(task);
        });
    }
}
