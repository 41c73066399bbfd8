use crate::exchange::ExchangeId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// All errors generated in `flux-data` while configuring and running a pipeline.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum DataError {
    #[error("unknown exchange: {0}, expected one of bitfinex, bitmex, okx")]
    UnknownExchange(String),

    #[error("unknown channel kind: {0}, expected one of book, book_raw, trades, trades_raw")]
    UnknownChannel(String),

    #[error("invalid subscription parameters: {0}")]
    InvalidSubscription(String),

    #[error("invalid endpoint url: {0}")]
    Url(String),

    #[error("subscription rejected by {exchange}: {reason}")]
    SubscriptionRejected { exchange: ExchangeId, reason: String },

    #[error("no subscription acknowledgement from {exchange} within {timeout:?}")]
    SubscribeTimeout {
        exchange: ExchangeId,
        timeout: Duration,
    },

    #[error("connection to {0} closed before the subscription was acknowledged")]
    ClosedBeforeSubscribed(ExchangeId),

    #[error("SocketError: {0}")]
    Socket(String),
}

impl DataError {
    /// Determine if an error ended the session, meaning the caller must open a new one to
    /// continue receiving data.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            DataError::SubscribeTimeout { .. } | DataError::ClosedBeforeSubscribed(_) => true,
            DataError::Socket(error_msg) => {
                let error_lower = error_msg.to_lowercase();
                error_lower.contains("terminated")
                    || error_lower.contains("connectionclosed")
                    || error_lower.contains("alreadyclosed")
                    || error_lower.contains("sendafterclosing")
                    || error_lower.contains("io(")
                    || error_lower.contains("timeout")
            }
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DataError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(format!("{value:?}"))
    }
}

/// Errors a [`Sink`](crate::sink::Sink) may return when persisting a window.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SinkError {
    #[error("sink io failure: {0}")]
    Io(String),

    #[error("failed to serialise window payload: {0}")]
    Serialise(String),

    #[error("sink receiver dropped")]
    Closed,
}

impl From<std::io::Error> for SinkError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialise(value.to_string())
    }
}

/// Errors that terminate a running [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
