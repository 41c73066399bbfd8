use crate::{
    aggregator::ChannelAggregator,
    error::{DataError, PipelineError},
    event::{MarketEvent, MarketIter},
    exchange::{ChannelKind, ExchangeId, Parser, subscription::SubscriptionParams},
    scheduler::{Horizon, WallClock, WindowScheduler},
    session::{SessionConfig, WsMessage, WsSession},
    sink::Sink,
};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

pub use crate::scheduler::PipelineExit;

/// Default window length in seconds.
pub const DEFAULT_TIME_STEP: u64 = 60;

/// Default number of parsed frames buffered between the receive task and the scheduler.
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Configuration of one (exchange, channel) capture pipeline.
#[derive(Clone, PartialEq, Debug)]
pub struct PipelineConfig {
    pub exchange: ExchangeId,
    pub channel: ChannelKind,
    pub params: SubscriptionParams,
    /// Window length in seconds, at least one.
    pub time_step: u64,
    pub horizon: Horizon,
    pub event_buffer: usize,
    pub session: SessionConfig,
    /// Overrides the exchange's default endpoint.
    pub url: Option<Url>,
}

impl PipelineConfig {
    pub fn new(exchange: ExchangeId, channel: ChannelKind, params: SubscriptionParams) -> Self {
        Self {
            exchange,
            channel,
            params,
            time_step: DEFAULT_TIME_STEP,
            horizon: Horizon::Never,
            event_buffer: DEFAULT_EVENT_BUFFER,
            session: SessionConfig::default(),
            url: None,
        }
    }

    pub fn with_time_step(self, time_step: u64) -> Self {
        Self {
            time_step: time_step.max(1),
            ..self
        }
    }

    pub fn with_horizon(self, horizon: Horizon) -> Self {
        Self { horizon, ..self }
    }

    pub fn with_event_buffer(self, event_buffer: usize) -> Self {
        Self {
            event_buffer,
            ..self
        }
    }

    pub fn with_session(self, session: SessionConfig) -> Self {
        Self { session, ..self }
    }

    pub fn with_url(self, url: Url) -> Self {
        Self {
            url: Some(url),
            ..self
        }
    }
}

/// Fully resolved pipeline: one session, one parser, one aggregator, one scheduler.
///
/// Every configuration error surfaces from [`Pipeline::init`], before any connection is
/// attempted.
#[derive(Debug)]
pub struct Pipeline {
    exchange: ExchangeId,
    channel: ChannelKind,
    url: Url,
    request: WsMessage,
    parser: Box<dyn Parser>,
    time_step: u64,
    horizon: Horizon,
    event_buffer: usize,
    session: SessionConfig,
}

impl Pipeline {
    pub fn init(config: PipelineConfig) -> Result<Self, DataError> {
        let PipelineConfig {
            exchange,
            channel,
            params,
            time_step,
            horizon,
            event_buffer,
            session,
            url,
        } = config;

        let url = match url {
            Some(url) => url,
            None => exchange.url()?,
        };
        let request = exchange.request(channel, &params)?;

        Ok(Self {
            exchange,
            channel,
            url,
            request,
            parser: exchange.parser(channel),
            time_step: time_step.max(1),
            horizon,
            event_buffer: event_buffer.max(1),
            session,
        })
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// Open the session, then capture windows into `sink` until the horizon is reached,
    /// `shutdown` resolves, or the connection ends.
    ///
    /// The session is closed before returning, whatever the outcome.
    pub async fn run<S>(
        self,
        sink: &mut S,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<PipelineExit, PipelineError>
    where
        S: Sink + ?Sized,
    {
        let Self {
            exchange,
            channel,
            url,
            request,
            parser,
            time_step,
            horizon,
            event_buffer,
            session,
        } = self;

        let mut session = WsSession::new(exchange, url, session);
        session.open(request).await?;

        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let (stop_tx, stop_rx) = oneshot::channel();
        let receiver = tokio::spawn(receive(session, parser, event_tx, stop_rx));

        let mut scheduler =
            WindowScheduler::new(channel, time_step, horizon, ChannelAggregator::new(channel))
                .with_clock(WallClock::system());
        let result = scheduler.run(event_rx, sink, shutdown).await;

        // Receive task may already have ended on disconnect
        let _ = stop_tx.send(());
        if let Err(error) = receiver.await {
            warn!(%exchange, %channel, %error, "receive task failed");
        }

        let exit = result?;
        info!(%exchange, %channel, %exit, "pipeline stopped");
        Ok(exit)
    }
}

/// Receive loop: parse every frame, drop heartbeats and unparsed frames, and forward the
/// remaining events to the scheduler until `stop` fires or the session ends.
async fn receive(
    mut session: WsSession,
    parser: Box<dyn Parser>,
    events: mpsc::Sender<MarketIter>,
    mut stop: oneshot::Receiver<()>,
) {
    let exchange = session.exchange();

    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut stop => break,
            frame = session.next_frame() => frame,
        };

        let Some(frame) = frame else {
            break;
        };

        let batch = parser
            .parse(&frame)
            .into_iter()
            .filter(|event| match event {
                MarketEvent::Heartbeat => {
                    debug!(%exchange, "heartbeat");
                    false
                }
                MarketEvent::Unparsed(raw) => {
                    debug!(%exchange, frame = %raw, "unparsed frame");
                    false
                }
                MarketEvent::Trade(_) | MarketEvent::BookDelta(_) | MarketEvent::BookReset => true,
            })
            .collect::<MarketIter>();

        if batch.0.is_empty() {
            continue;
        }

        tokio::select! {
            biased;
            _ = &mut stop => break,
            sent = events.send(batch) => if sent.is_err() {
                break;
            },
        }
    }

    session.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregator::WindowPayload,
        event::PublicTrade,
        session::testing::serve,
        sink::{ChannelSink, WindowRecord},
    };
    use std::time::Duration;

    fn bitfinex_trades(url: Url) -> PipelineConfig {
        PipelineConfig::new(
            ExchangeId::Bitfinex,
            ChannelKind::TradesRaw,
            SubscriptionParams::new().with("symbol", "tBTCUSD"),
        )
        .with_time_step(1)
        .with_url(url)
    }

    fn trades(records: Vec<WindowRecord>) -> Vec<PublicTrade> {
        records
            .into_iter()
            .flat_map(|record| match record.payload {
                WindowPayload::Trades(trades) => trades,
                other => panic!("unexpected payload: {other:?}"),
            })
            .collect()
    }

    fn collect(mut rx: mpsc::UnboundedReceiver<WindowRecord>) -> Vec<WindowRecord> {
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_pipeline_init_config_errors() {
        let bad_symbol = PipelineConfig::new(
            ExchangeId::Bitmex,
            ChannelKind::Book,
            SubscriptionParams::new().with("symbol", 42),
        );
        assert!(matches!(
            Pipeline::init(bad_symbol),
            Err(DataError::InvalidSubscription(_))
        ));

        let pipeline = Pipeline::init(
            PipelineConfig::new(ExchangeId::Okx, ChannelKind::Trades, SubscriptionParams::new())
                .with_time_step(0)
                .with_event_buffer(0),
        )
        .unwrap();
        assert_eq!(pipeline.time_step, 1);
        assert_eq!(pipeline.event_buffer, 1);
        assert_eq!(pipeline.url.as_str(), "wss://ws.okx.com:8443/ws/v5/public");
    }

    #[tokio::test]
    async fn test_pipeline_runs_until_disconnect() {
        let (url, _server) = serve(vec![
            WsMessage::text(r#"{"event":"info","version":2}"#),
            WsMessage::text(r#"{"event":"subscribed","channel":"trades","chanId":7}"#),
            WsMessage::text(r#"[7,"hb"]"#),
            WsMessage::text(r#"[7,"te",[1,1574694478808,0.5,7245.3]]"#),
            WsMessage::text(r#"{"garbage": true}"#),
            WsMessage::text(r#"[7,"tu",[1,1574694478808,0.5,7245.3]]"#),
            WsMessage::text(r#"[7,"te",[2,1574694478900,-0.25,7245.1]]"#),
            WsMessage::Close(None),
        ])
        .await;

        let (mut sink, records) = ChannelSink::unbounded();
        let exit = Pipeline::init(bitfinex_trades(url))
            .unwrap()
            .run(&mut sink, std::future::pending())
            .await
            .unwrap();

        assert_eq!(exit, PipelineExit::Disconnected);

        let trades = trades(collect(records));
        assert_eq!(
            trades.iter().map(|trade| trade.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(trades[1].amount, 0.25);
    }

    #[tokio::test]
    async fn test_pipeline_shutdown() {
        let (url, server) = serve(vec![
            WsMessage::text(r#"{"event":"subscribed","channel":"trades","chanId":7}"#),
            WsMessage::text(r#"[7,"te",[1,1574694478808,0.5,7245.3]]"#),
        ])
        .await;

        let (mut sink, records) = ChannelSink::unbounded();
        let exit = Pipeline::init(bitfinex_trades(url))
            .unwrap()
            .run(
                &mut sink,
                tokio::time::sleep(Duration::from_millis(300)),
            )
            .await
            .unwrap();

        assert_eq!(exit, PipelineExit::Shutdown);
        assert_eq!(trades(collect(records)).len(), 1);

        // Session was closed, so the server side sees the client go away
        assert!(server.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pipeline_horizon() {
        let (url, _server) = serve(vec![WsMessage::text(
            r#"{"event":"subscribed","channel":"trades","chanId":7}"#,
        )])
        .await;

        let (mut sink, records) = ChannelSink::unbounded();
        let exit = Pipeline::init(
            bitfinex_trades(url).with_horizon(Horizon::For(Duration::from_millis(200))),
        )
        .unwrap()
        .run(&mut sink, std::future::pending())
        .await
        .unwrap();

        assert_eq!(exit, PipelineExit::Horizon);
        assert!(collect(records).is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_open_failure() {
        let (url, _server) = serve(vec![WsMessage::text(
            r#"{"event":"error","msg":"symbol: invalid","code":10300}"#,
        )])
        .await;

        let (mut sink, _records) = ChannelSink::unbounded();
        let actual = Pipeline::init(bitfinex_trades(url))
            .unwrap()
            .run(&mut sink, std::future::pending())
            .await;

        assert!(matches!(
            actual,
            Err(PipelineError::Data(DataError::SubscriptionRejected { .. }))
        ));
    }
}
