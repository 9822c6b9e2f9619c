//! Bounded, cancellable waiting for long-running external operations.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{RestkitError, RestkitResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between attempts.
    pub interval: Duration,
    /// Overall deadline, probe time included.
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }
}

fn timed_out(operation: &str, config: &PollConfig) -> RestkitError {
    RestkitError::Timeout {
        operation: operation.to_string(),
        duration_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

fn cancelled(operation: &str) -> RestkitError {
    RestkitError::Cancelled {
        operation: operation.to_string(),
    }
}

/// Run `probe` until it yields a value.
///
/// `Ok(Some(v))` finishes, `Ok(None)` waits `interval` and tries again, `Err`
/// aborts. Exceeding `timeout` returns [`RestkitError::Timeout`]; a fired
/// `cancel` token returns [`RestkitError::Cancelled`].
pub async fn poll_until<T, F, Fut>(
    operation: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> RestkitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RestkitResult<Option<T>>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(operation));
        }
        attempt += 1;

        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled(operation)),
            outcome = timeout_at(deadline, probe()) => outcome,
        };
        match outcome {
            Err(_) => return Err(timed_out(operation, config)),
            Ok(result) => {
                if let Some(value) = result? {
                    debug!(operation, attempt, "poll finished");
                    return Ok(value);
                }
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(operation, config));
        }
        let pause = config.interval.min(deadline - now);
        debug!(operation, attempt, "not ready, waiting");

        tokio::select! {
            () = cancel.cancelled() => return Err(cancelled(operation)),
            () = tokio::time::sleep(pause) => {}
        }
    }
}
