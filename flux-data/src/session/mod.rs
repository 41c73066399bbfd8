use self::timeout::{DEFAULT_READ_TIMEOUT, ReadTimeout};
use crate::{
    error::DataError,
    exchange::{ExchangeId, PingInterval, subscription::SubscriptionAck},
};
use derive_more::Display;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

/// [`ReadTimeout`] stream wrapper ending silent connections.
pub mod timeout;

#[cfg(test)]
pub(crate) mod testing;

/// Convenient type alias for a tungstenite WebSocket message.
pub type WsMessage = tokio_tungstenite::tungstenite::Message;

/// Convenient type alias for a tungstenite WebSocket error.
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Convenient type alias for a tokio-tungstenite WebSocket connection.
pub type WebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsStream = ReadTimeout<SplitStream<WebSocket>>;

/// Default time allowed for an exchange to acknowledge the subscribe request.
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection status of a [`WsSession`].
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Subscribed,
    Closing,
}

/// Timeouts applied by a [`WsSession`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct SessionConfig {
    pub subscribe_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn with_subscribe_timeout(self, subscribe_timeout: Duration) -> Self {
        Self {
            subscribe_timeout,
            ..self
        }
    }

    pub fn with_read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }
}

/// One WebSocket connection to one exchange endpoint carrying a single subscription.
///
/// The session never reconnects: once the connection drops (close frame, protocol error,
/// read timeout) it moves to [`SessionStatus::Closing`] and [`WsSession::next_frame`]
/// yields `None` from then on.
pub struct WsSession {
    exchange: ExchangeId,
    url: Url,
    config: SessionConfig,
    status: SessionStatus,
    sink: Option<WsSink>,
    stream: Option<WsStream>,
    ping: Option<PingInterval>,
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("exchange", &self.exchange)
            .field("url", &self.url.as_str())
            .field("config", &self.config)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Reason [`WsSession::next_frame`] woke up.
enum Wake {
    Message(Option<Result<WsMessage, WsError>>),
    Ping(WsMessage),
}

impl WsSession {
    pub fn new(exchange: ExchangeId, url: Url, config: SessionConfig) -> Self {
        Self {
            exchange,
            url,
            config,
            status: SessionStatus::Disconnected,
            sink: None,
            stream: None,
            ping: None,
        }
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Connect, send exactly one subscribe `request` and wait for the exchange to
    /// acknowledge it.
    ///
    /// Frames received before the acknowledgement (welcome banners, info events) are
    /// logged and discarded.
    pub async fn open(&mut self, request: WsMessage) -> Result<(), DataError> {
        if self.status != SessionStatus::Disconnected {
            return Err(DataError::Socket(format!(
                "cannot open {} session while {}",
                self.exchange, self.status
            )));
        }

        self.status = SessionStatus::Connecting;
        info!(exchange = %self.exchange, url = %self.url, "connecting");

        match self.subscribe(request).await {
            Ok((sink, stream)) => {
                info!(exchange = %self.exchange, "subscribed");
                self.sink = Some(sink);
                self.stream = Some(ReadTimeout::new(stream, self.config.read_timeout));
                self.ping = self.exchange.ping_interval();
                self.status = SessionStatus::Subscribed;
                Ok(())
            }
            Err(error) => {
                warn!(exchange = %self.exchange, %error, "failed to open session");
                self.status = SessionStatus::Disconnected;
                Err(error)
            }
        }
    }

    async fn subscribe(
        &self,
        request: WsMessage,
    ) -> Result<(WsSink, SplitStream<WebSocket>), DataError> {
        let (websocket, _) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = websocket.split();

        debug!(exchange = %self.exchange, ?request, "sending subscribe request");
        sink.send(request).await?;

        let timeout = self.config.subscribe_timeout;
        match tokio::time::timeout(timeout, self.await_ack(&mut stream)).await {
            Ok(Ok(())) => Ok((sink, stream)),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(DataError::SubscribeTimeout {
                exchange: self.exchange,
                timeout,
            }),
        }
    }

    async fn await_ack(&self, stream: &mut SplitStream<WebSocket>) -> Result<(), DataError> {
        while let Some(message) = stream.next().await {
            let frame = match message? {
                WsMessage::Text(text) => text.as_str().to_owned(),
                WsMessage::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                WsMessage::Close(frame) => {
                    debug!(exchange = %self.exchange, ?frame, "closed while subscribing");
                    break;
                }
                _ => continue,
            };

            match self.exchange.ack(&frame) {
                SubscriptionAck::Subscribed => return Ok(()),
                SubscriptionAck::Rejected(reason) => {
                    return Err(DataError::SubscriptionRejected {
                        exchange: self.exchange,
                        reason,
                    });
                }
                SubscriptionAck::Pending => {
                    debug!(exchange = %self.exchange, %frame, "discarding frame received before subscription ack");
                }
            }
        }

        Err(DataError::ClosedBeforeSubscribed(self.exchange))
    }

    /// Wait for the next text frame, sending application-level pings when the exchange
    /// requires them.
    ///
    /// Heartbeat frames are yielded like any other. Returns `None` once the connection
    /// has ended.
    pub async fn next_frame(&mut self) -> Option<String> {
        loop {
            if self.status != SessionStatus::Subscribed {
                return None;
            }

            let stream = self.stream.as_mut()?;
            let wake = match self.ping.as_mut() {
                Some(ping) => {
                    let make_ping = ping.ping;
                    tokio::select! {
                        message = stream.next() => Wake::Message(message),
                        _ = ping.interval.tick() => Wake::Ping(make_ping()),
                    }
                }
                None => Wake::Message(stream.next().await),
            };

            match wake {
                Wake::Ping(ping) => {
                    debug!(exchange = %self.exchange, ?ping, "sending custom application-level ping");
                    if let Err(error) = self.send(ping).await {
                        warn!(exchange = %self.exchange, %error, "failed to send ping");
                        self.status = SessionStatus::Closing;
                    }
                }
                Wake::Message(Some(Ok(WsMessage::Text(text)))) => {
                    return Some(text.as_str().to_owned());
                }
                Wake::Message(Some(Ok(WsMessage::Binary(bytes)))) => {
                    match String::from_utf8(bytes.to_vec()) {
                        Ok(frame) => return Some(frame),
                        Err(error) => {
                            debug!(exchange = %self.exchange, %error, "skipping non utf-8 binary frame")
                        }
                    }
                }
                Wake::Message(Some(Ok(WsMessage::Close(frame)))) => {
                    info!(exchange = %self.exchange, ?frame, "server closed connection");
                    self.status = SessionStatus::Closing;
                }
                Wake::Message(Some(Ok(_))) => {
                    // Protocol level ping / pong, answered by tungstenite
                }
                Wake::Message(Some(Err(error))) => {
                    warn!(exchange = %self.exchange, %error, "WebSocket error");
                    self.status = SessionStatus::Closing;
                }
                Wake::Message(None) => {
                    let timed_out = self.stream.as_ref().is_some_and(ReadTimeout::timed_out);
                    warn!(exchange = %self.exchange, timed_out, "WebSocket stream ended");
                    self.status = SessionStatus::Closing;
                }
            }
        }
    }

    async fn send(&mut self, message: WsMessage) -> Result<(), DataError> {
        match self.sink.as_mut() {
            Some(sink) => sink.send(message).await.map_err(DataError::from),
            None => Err(DataError::Socket(format!(
                "{} session has no open connection",
                self.exchange
            ))),
        }
    }

    /// Close the connection, if any, and release it.
    pub async fn close(&mut self) {
        if self.status == SessionStatus::Disconnected {
            return;
        }

        self.status = SessionStatus::Closing;
        if let Some(mut sink) = self.sink.take() {
            if let Err(error) = sink.close().await {
                debug!(exchange = %self.exchange, %error, "error closing WebSocket");
            }
        }

        self.stream = None;
        self.ping = None;
        self.status = SessionStatus::Disconnected;
        info!(exchange = %self.exchange, "session closed");
    }
}
