use std::fmt;

use tokio::sync::oneshot;

use crate::{Response, Result};

type Callback = Box<dyn FnOnce(Result<Response>) + Send + 'static>;

/// Continuation invoked exactly once with the outcome of a request.
///
/// The outcome is either the decoded response, the error status reported by
/// the service, or the error the request was flushed with. A completion runs
/// on whichever thread delivers the outcome and must not block.
///
/// # Example
///
/// ```
/// # use radio_config_rpc::{Completion, Response};
/// # async fn example() {
/// let (completion, rx) = Completion::channel();
/// completion.complete(Ok(Response::Ack));
/// assert_eq!(rx.await.unwrap(), Ok(Response::Ack));
/// # }
/// ```
pub struct Completion {
    callback: Option<Callback>,
}

impl Completion {
    // ---

    /// Complete by calling `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        // ---
        Self {
            callback: Some(Box::new(f)),
        }
    }

    /// Complete through a oneshot channel; await the returned receiver.
    ///
    /// If the receiver has been dropped the outcome is discarded.
    pub fn channel() -> (Self, oneshot::Receiver<Result<Response>>) {
        // ---
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move |result| {
            // receiver gone: caller stopped waiting
            let _ = tx.send(result);
        });
        (completion, rx)
    }

    /// Discard the outcome.
    pub fn ignore() -> Self {
        Self { callback: None }
    }

    /// Deliver the outcome, consuming the completion.
    pub fn complete(mut self, result: Result<Response>) {
        // ---
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("armed", &self.callback.is_some())
            .finish()
    }
}
