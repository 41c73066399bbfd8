#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Flux-Data
//! Windowed market data capture from cryptocurrency exchange WebSocket feeds.
//!
//! Each [`Pipeline`](pipeline::Pipeline) owns one exchange connection carrying one
//! subscription, and turns its frames into one payload per fixed-length time window:
//! * **Order book depth**: book deltas are applied to a live
//!   [`OrderBookAggregator`](books::OrderBookAggregator) and a cumulative
//!   [`DepthSnapshot`](books::DepthSnapshot) is taken at every boundary.
//! * **OHLC candles**: trades are bucketed into one [`OhlcBar`](aggregator::ohlc::OhlcBar)
//!   per window.
//! * **Raw**: every parsed trade or book delta is passed through, in arrival order.
//!
//! Supported exchanges are `Bitfinex`, `Bitmex` and `Okx`. The exchange and channel kind
//! are resolved once at configuration time into a concrete
//! [`Parser`](exchange::Parser) and [`Aggregator`](aggregator::Aggregator).
//!
//! ## Example
//! ```rust,no_run
//! use flux_data::{
//!     exchange::{ChannelKind, ExchangeId, subscription::SubscriptionParams},
//!     pipeline::{Pipeline, PipelineConfig},
//!     scheduler::Horizon,
//!     sink::ChannelSink,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::new(
//!         ExchangeId::Bitfinex,
//!         ChannelKind::Trades,
//!         SubscriptionParams::new().with("symbol", "tBTCUSD"),
//!     )
//!     .with_time_step(60)
//!     .with_horizon(Horizon::For(Duration::from_secs(3600)));
//!
//!     let (mut sink, mut windows) = ChannelSink::unbounded();
//!     tokio::spawn(async move {
//!         while let Some(window) = windows.recv().await {
//!             println!("{window:?}");
//!         }
//!     });
//!
//!     let exit = Pipeline::init(config)
//!         .unwrap()
//!         .run(&mut sink, std::future::pending())
//!         .await
//!         .unwrap();
//!     println!("pipeline stopped: {exit}");
//! }
//! ```

/// Window aggregators: [`Aggregator`](aggregator::Aggregator) trait, OHLC bucketing, raw
/// buffers and the [`WindowPayload`](aggregator::WindowPayload) they produce.
pub mod aggregator;

/// Live order book reconstruction and [`DepthSnapshot`](books::DepthSnapshot)s.
pub mod books;

/// Serde helpers shared by exchange message types.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Flux-Data.
pub mod error;

/// Normalised [`MarketEvent`](event::MarketEvent)s produced by exchange parsers.
pub mod event;

/// [`ExchangeId`](exchange::ExchangeId), [`ChannelKind`](exchange::ChannelKind),
/// per-exchange [`Connector`](exchange::Connector)s and [`Parser`](exchange::Parser)s.
pub mod exchange;

/// [`Pipeline`](pipeline::Pipeline) wiring a session, parser, aggregator and scheduler.
pub mod pipeline;

/// [`WindowScheduler`](scheduler::WindowScheduler) driving window boundaries and horizon.
pub mod scheduler;

/// Single-subscription [`WsSession`](session::WsSession) over a WebSocket connection.
pub mod session;

/// [`Sink`](sink::Sink) contract and provided sinks.
pub mod sink;
