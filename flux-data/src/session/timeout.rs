//! Read timeout wrapper for WebSocket streams.
//!
//! A silent connection produces no protocol error, so the wrapped stream ends itself once
//! nothing has been received for the configured period.

use futures::Stream;
use pin_project::pin_project;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::{Instant, Sleep};

/// Default read timeout for WebSocket streams (2 minutes).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Stream wrapper that ends the stream if no item is received for `timeout`.
#[pin_project]
#[derive(Debug)]
pub struct ReadTimeout<S> {
    #[pin]
    inner: S,
    timeout: Duration,
    deadline: Pin<Box<Sleep>>,
    timed_out: bool,
}

impl<S> ReadTimeout<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            deadline: Box::pin(tokio::time::sleep(timeout)),
            timed_out: false,
        }
    }

    /// Returns `true` if the stream ended because the read timeout elapsed.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl<S> Stream for ReadTimeout<S>
where
    S: Stream,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.timed_out {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(item)) => {
                this.deadline
                    .as_mut()
                    .reset(Instant::now() + *this.timeout);
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => match this.deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    tracing::warn!(
                        timeout_secs = this.timeout.as_secs_f64(),
                        "WebSocket read timeout - no data received, ending stream"
                    );
                    *this.timed_out = true;
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
