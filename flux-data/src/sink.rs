use crate::{aggregator::WindowPayload, error::SinkError, exchange::ChannelKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::mpsc;

/// Persistence boundary receiving one sealed payload per window.
///
/// Called at most once per (pipeline, window). Errors are returned to the scheduler,
/// which stops the pipeline without retrying.
#[async_trait]
pub trait Sink: Send {
    async fn write(
        &mut self,
        window_start: i64,
        channel: ChannelKind,
        payload: WindowPayload,
    ) -> Result<(), SinkError>;
}

/// One sealed window as handed to a [`Sink`].
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct WindowRecord {
    pub window_start: i64,
    pub channel: ChannelKind,
    pub payload: WindowPayload,
}

/// [`Sink`] forwarding every [`WindowRecord`] over a tokio mpsc channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WindowRecord>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<WindowRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn write(
        &mut self,
        window_start: i64,
        channel: ChannelKind,
        payload: WindowPayload,
    ) -> Result<(), SinkError> {
        self.tx
            .send(WindowRecord {
                window_start,
                channel,
                payload,
            })
            .map_err(|_| SinkError::Closed)
    }
}

/// [`Sink`] appending each [`WindowRecord`] as one JSON object per line.
///
/// Records are serialised on the runtime, while the write and flush run on tokio's
/// blocking pool so a slow file never stalls the scheduler's task.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Option<W>,
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Recover the writer, `None` if a blocking write panicked while holding it.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

#[async_trait]
impl<W> Sink for JsonLinesSink<W>
where
    W: Write + Send + 'static,
{
    async fn write(
        &mut self,
        window_start: i64,
        channel: ChannelKind,
        payload: WindowPayload,
    ) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&WindowRecord {
            window_start,
            channel,
            payload,
        })?;
        line.push(b'\n');

        let mut writer = self.writer.take().ok_or(SinkError::Closed)?;
        let (writer, written) = tokio::task::spawn_blocking(move || {
            let written = writer.write_all(&line).and_then(|()| writer.flush());
            (writer, written)
        })
        .await
        .map_err(|error| SinkError::Io(error.to_string()))?;

        self.writer = Some(writer);
        written.map_err(SinkError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ohlc::OhlcBar;

    fn bar() -> WindowPayload {
        WindowPayload::Ohlc(OhlcBar {
            window_start: 60,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 2.0,
        })
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut sink, mut rx) = ChannelSink::unbounded();

        sink.write(60, ChannelKind::Trades, bar()).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(WindowRecord {
                window_start: 60,
                channel: ChannelKind::Trades,
                payload: bar(),
            })
        );

        drop(rx);
        assert_eq!(
            sink.write(120, ChannelKind::Trades, bar()).await,
            Err(SinkError::Closed)
        );
    }

    #[tokio::test]
    async fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write(60, ChannelKind::Trades, bar()).await.unwrap();
        sink.write(120, ChannelKind::Trades, bar()).await.unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);

        let first = serde_json::from_str::<WindowRecord>(lines[0]).unwrap();
        assert_eq!(first.window_start, 60);
        assert_eq!(first.channel, ChannelKind::Trades);
        assert_eq!(first.payload, bar());
    }

    #[derive(Debug)]
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_json_lines_sink_io_error() {
        let mut sink = JsonLinesSink::new(FullDisk);

        for _ in 0..2 {
            assert_eq!(
                sink.write(60, ChannelKind::Trades, bar()).await,
                Err(SinkError::Io("no space left on device".to_string()))
            );
        }
        assert!(sink.into_inner().is_some());
    }
}
