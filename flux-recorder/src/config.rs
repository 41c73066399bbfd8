use chrono::{DateTime, Utc};
use flux_data::{
    error::DataError,
    exchange::{ChannelKind, ExchangeId, subscription::SubscriptionParams},
    pipeline::{DEFAULT_EVENT_BUFFER, DEFAULT_TIME_STEP, Pipeline, PipelineConfig},
    scheduler::Horizon,
};
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;

pub const ENV_PIPELINES: &str = "FLUX_PIPELINES";
pub const ENV_TIME_STEP: &str = "FLUX_TIME_STEP";
pub const ENV_HORIZON_SECS: &str = "FLUX_HORIZON_SECS";
pub const ENV_OUTPUT_DIR: &str = "FLUX_OUTPUT_DIR";
pub const ENV_EVENT_BUFFER: &str = "FLUX_EVENT_BUFFER";

pub const DEFAULT_OUTPUT_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{ENV_PIPELINES} is not set or contains no pipelines")]
    NoPipelines,

    #[error("invalid pipeline entry '{entry}', expected exchange:channel[:{{params}}]")]
    Entry { entry: String },

    #[error("invalid pipeline entry '{entry}': {source}")]
    Data { entry: String, source: DataError },

    #[error("{var} must be an integer, got '{value}'")]
    Integer { var: &'static str, value: String },

    #[error("cannot initialise {exchange} {channel} pipeline: {source}")]
    Pipeline {
        exchange: ExchangeId,
        channel: ChannelKind,
        source: DataError,
    },
}

/// Recorder settings loaded from `FLUX_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    pub pipelines: Vec<PipelineConfig>,
    pub output_dir: PathBuf,
}

impl RecorderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|var| std::env::var(var).ok(), Utc::now())
    }

    /// Build a [`RecorderConfig`] from a variable lookup, resolving any horizon relative to
    /// `now`.
    pub fn from_vars<F>(lookup: F, now: DateTime<Utc>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let time_step = integer(&lookup, ENV_TIME_STEP)?
            .map_or(DEFAULT_TIME_STEP, |step| step.max(1).unsigned_abs());

        let horizon = integer(&lookup, ENV_HORIZON_SECS)?
            .map_or(Horizon::Never, |secs| Horizon::from_secs(secs, now));

        let event_buffer = integer(&lookup, ENV_EVENT_BUFFER)?.map_or(DEFAULT_EVENT_BUFFER, |size| {
            usize::try_from(size.max(1)).unwrap_or(DEFAULT_EVENT_BUFFER)
        });

        let output_dir = lookup(ENV_OUTPUT_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);

        let pipelines = lookup(ENV_PIPELINES)
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                parse_entry(entry).map(|config| {
                    config
                        .with_time_step(time_step)
                        .with_horizon(horizon)
                        .with_event_buffer(event_buffer)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if pipelines.is_empty() {
            return Err(ConfigError::NoPipelines);
        }

        Ok(Self {
            pipelines,
            output_dir,
        })
    }

    /// Initialise every configured [`Pipeline`], failing on the first that cannot start.
    pub fn init_pipelines(&self) -> Result<Vec<Pipeline>, ConfigError> {
        self.pipelines
            .iter()
            .cloned()
            .map(|config| {
                let (exchange, channel) = (config.exchange, config.channel);
                Pipeline::init(config).map_err(|source| ConfigError::Pipeline {
                    exchange,
                    channel,
                    source,
                })
            })
            .collect()
    }
}

fn integer<F>(lookup: &F, var: &'static str) -> Result<Option<i64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::Integer { var, value }),
    }
}

/// Parse one `exchange:channel[:{params}]` entry. Only the first two colons separate
/// fields, so params may contain colons of their own.
fn parse_entry(entry: &str) -> Result<PipelineConfig, ConfigError> {
    let mut fields = entry.splitn(3, ':');
    let (Some(exchange), Some(channel)) = (fields.next(), fields.next()) else {
        return Err(ConfigError::Entry {
            entry: entry.to_owned(),
        });
    };

    let data_error = |source| ConfigError::Data {
        entry: entry.to_owned(),
        source,
    };

    Ok(PipelineConfig::new(
        ExchangeId::from_str(exchange).map_err(data_error)?,
        ChannelKind::from_str(channel).map_err(data_error)?,
        SubscriptionParams::from_str(fields.next().unwrap_or_default()).map_err(data_error)?,
    ))
}
