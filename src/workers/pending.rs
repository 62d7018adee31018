//! Result handle for a submitted task.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::db::error::CacheError;

pub(crate) type Completer<T> = oneshot::Sender<Result<T, CacheError>>;

/// Future resolved exactly once with the outcome of a submitted task.
///
/// Dropping it does not cancel the task; the work still runs to completion.
#[must_use = "the task runs regardless, but its result is lost unless awaited"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, CacheError>>,
}

impl<T> Pending<T> {
    pub(crate) fn channel() -> (Completer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Already resolved handle.
    pub(crate) fn ready(result: Result<T, CacheError>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    /// Blocks the current thread until the task completes.
    ///
    /// Must not be called from inside an async runtime; `.await` the handle there instead.
    pub fn wait(self) -> Result<T, CacheError> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(CacheError::ExecutorStopped))
    }

    /// Non-blocking check, `None` while the task is still queued or running.
    pub(crate) fn try_take(&mut self) -> Option<Result<T, CacheError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(CacheError::ExecutorStopped)),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, CacheError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(CacheError::ExecutorStopped)))
    }
}
