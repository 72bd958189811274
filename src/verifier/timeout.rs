use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::VerifyError;

/// Runs `task` on its own thread and waits at most `timeout` for it.
///
/// When the timeout wins the caller gets [`VerifyError::Timeout`] right away;
/// the worker keeps running detached and its result is dropped. Tasks should
/// bound their own I/O with a [`Deadline`](crate::Deadline) so the abandoned
/// worker does not linger.
pub fn run_with_timeout<T, F>(timeout: Duration, task: F) -> Result<T, VerifyError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VerifyError> + Send + 'static,
{
    // capacity 1: an abandoned worker must never block on send
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("mailprobe-verify".to_string())
        .spawn(move || {
            let _ = tx.send(task());
        })
        .map_err(VerifyError::Spawn)?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            debug!(?timeout, "verification abandoned");
            Err(VerifyError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(VerifyError::WorkerLost),
    }
}
