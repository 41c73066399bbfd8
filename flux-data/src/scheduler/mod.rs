use crate::{
    aggregator::{Aggregator, WindowPayload},
    error::SinkError,
    event::MarketIter,
    exchange::ChannelKind,
    sink::Sink,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// [`Window`], [`WallClock`] and [`Horizon`] time primitives.
pub mod window;

pub use window::{Horizon, WallClock, Window};

/// Lifecycle of a [`WindowScheduler`].
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Flushing the last, possibly partial, window.
    Draining,
    Stopped,
}

/// Why a pipeline stopped.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum PipelineExit {
    /// Configured [`Horizon`] reached.
    Horizon,
    /// Shutdown signal received.
    Shutdown,
    /// Event source ended, eg/ the exchange connection dropped.
    Disconnected,
}

/// Drives the time base of a pipeline.
///
/// Events received while window `t` is current are applied to the aggregator under `t`.
/// At every boundary `t + step` the window is sealed, its payload handed to the
/// [`Sink`], and `t` advances by `step`. Ticks are wall-clock driven: they fire on
/// schedule whether or not events arrived.
#[derive(Debug)]
pub struct WindowScheduler<A> {
    channel: ChannelKind,
    step: i64,
    horizon: Horizon,
    clock: WallClock,
    aggregator: A,
    state: SchedulerState,
}

impl<A> WindowScheduler<A>
where
    A: Aggregator<Output = WindowPayload>,
{
    /// `step` is in seconds, clamped to a minimum of one.
    pub fn new(channel: ChannelKind, step: u64, horizon: Horizon, aggregator: A) -> Self {
        Self {
            channel,
            step: i64::try_from(step.max(1)).unwrap_or(i64::MAX),
            horizon,
            clock: WallClock::system(),
            aggregator,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_clock(self, clock: WallClock) -> Self {
        Self { clock, ..self }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run until the [`Horizon`] is reached, `shutdown` resolves, or the `events` source
    /// ends. The last window is always drained to the `sink` before returning.
    ///
    /// A [`Sink`] error stops the scheduler immediately and is returned as is.
    pub async fn run<S>(
        &mut self,
        mut events: mpsc::Receiver<MarketIter>,
        sink: &mut S,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineExit, SinkError>
    where
        S: Sink + ?Sized,
    {
        self.state = SchedulerState::Running;

        let start_ms = self.clock.now_ms();
        let until_ms = self.horizon.deadline_ms(start_ms);
        let mut window = Window::align(start_ms.div_euclid(1000), self.step);
        info!(channel = %self.channel, step = self.step, window_start = window.start, ?until_ms, "scheduler running");

        tokio::pin!(shutdown);

        let exit = loop {
            let boundary_ms = window.end().saturating_mul(1000);
            let deadline_ms = until_ms.map_or(boundary_ms, |until| until.min(boundary_ms));
            let deadline = self.clock.instant_at_ms(deadline_ms);

            tokio::select! {
                biased;

                _ = &mut shutdown => break PipelineExit::Shutdown,

                _ = tokio::time::sleep_until(deadline) => {
                    self.absorb_queued(window, &mut events);

                    if until_ms.is_some_and(|until| self.clock.now_ms() >= until) {
                        break PipelineExit::Horizon;
                    }

                    if let Err(error) = self.flush(window, sink).await {
                        self.state = SchedulerState::Stopped;
                        return Err(error);
                    }
                    window = window.next();
                }

                batch = events.recv() => match batch {
                    Some(batch) => self.aggregator.apply(window, batch),
                    None => break PipelineExit::Disconnected,
                },
            }
        };

        info!(channel = %self.channel, %exit, window_start = window.start, "scheduler draining");
        self.state = SchedulerState::Draining;
        self.absorb_queued(window, &mut events);
        let drained = self.flush(window, sink).await;
        self.state = SchedulerState::Stopped;

        drained.map(|()| exit)
    }

    /// Apply batches already queued when `window` closes, so they are sealed with the
    /// window they were received in.
    fn absorb_queued(&mut self, window: Window, events: &mut mpsc::Receiver<MarketIter>) {
        while let Ok(batch) = events.try_recv() {
            self.aggregator.apply(window, batch);
        }
    }

    async fn flush<S>(&mut self, window: Window, sink: &mut S) -> Result<(), SinkError>
    where
        S: Sink + ?Sized,
    {
        match self.aggregator.seal(window) {
            Some(payload) => {
                debug!(channel = %self.channel, window_start = window.start, "flushing window");
                sink.write(window.start, self.channel, payload).await
            }
            None => {
                debug!(channel = %self.channel, window_start = window.start, "empty window, nothing to flush");
                Ok(())
            }
        }
    }
}
