use crate::config::RecorderConfig;
use flux_data::{
    error::PipelineError,
    pipeline::{Pipeline, PipelineExit},
    sink::JsonLinesSink,
};
use std::{
    fs::{self, OpenOptions},
    io::BufWriter,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

mod config;

/// Errors that stop a single recording pipeline.
#[derive(Debug, Error)]
enum RecorderError {
    #[error("failed to open output file {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[tokio::main]
async fn main() {
    init_logging();

    let config = match RecorderConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid flux-recorder configuration");
            std::process::exit(1);
        }
    };

    let pipelines = match config.init_pipelines() {
        Ok(pipelines) => pipelines,
        Err(error) => {
            error!(%error, "invalid flux-recorder configuration");
            std::process::exit(1);
        }
    };

    info!(
        pipelines = pipelines.len(),
        output_dir = %config.output_dir.display(),
        "starting flux-recorder"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received, sealing open windows");
                let _ = shutdown_tx.send(true);
            }
            Err(error) => {
                warn!(%error, "failed to listen for shutdown signal, running until horizon");
                futures::future::pending::<()>().await;
            }
        }
    });

    let tasks = pipelines
        .into_iter()
        .map(|pipeline| {
            tokio::spawn(record(
                pipeline,
                config.output_dir.clone(),
                shutdown_rx.clone(),
            ))
        })
        .collect::<Vec<_>>();

    let mut failures = 0usize;
    for result in futures::future::join_all(tasks).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                error!(%error, "pipeline failed");
                failures += 1;
            }
            Err(error) => {
                error!(%error, "pipeline task panicked");
                failures += 1;
            }
        }
    }

    info!(failures, "flux-recorder stopped");
    if failures > 0 {
        std::process::exit(1);
    }
}

/// Run one pipeline, appending its windows to `{output_dir}/{exchange}/{channel}.jsonl`.
async fn record(
    pipeline: Pipeline,
    output_dir: PathBuf,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), RecorderError> {
    let (exchange, channel) = (pipeline.exchange(), pipeline.channel());
    let path = output_dir
        .join(exchange.to_string())
        .join(format!("{channel}.jsonl"));

    let mut sink = JsonLinesSink::new(open_output(&path)?);

    info!(%exchange, %channel, path = %path.display(), "recording pipeline");

    let exit = pipeline
        .run(&mut sink, async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    match exit {
        PipelineExit::Disconnected => warn!(%exchange, %channel, %exit, "pipeline stopped"),
        PipelineExit::Horizon | PipelineExit::Shutdown => {
            info!(%exchange, %channel, %exit, "pipeline stopped")
        }
    }

    Ok(())
}

fn open_output(path: &Path) -> Result<BufWriter<fs::File>, RecorderError> {
    let output_error = |source| RecorderError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(output_error)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(output_error)
}

/// Initialise logging: `RUST_LOG` filter, defaulting to INFO, with JSON output when
/// `FLUX_LOG_JSON` is set.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var_os("FLUX_LOG_JSON").is_some() {
        builder.json().init();
    } else {
        builder.init();
    }
}
