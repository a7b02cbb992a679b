//! Process-wide state, built once at startup and torn down explicitly.

use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::fetcher::FootballDataClient;
use crate::loader::PgLoader;
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;

pub type EtlPipeline = Pipeline<FootballDataClient, PgLoader>;

/// Install the console + append-only file log sinks.
///
/// The returned guard flushes the file writer when dropped.
pub fn init_logging(config: &Config) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&config.log_dir, config.profile.log_file_name());
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("epl_etl=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Holds the config, the pipeline and the logging guard for the
/// lifetime of the process.
pub struct EtlContext {
    pub config: Config,
    pipeline: EtlPipeline,
    _log_guard: WorkerGuard,
}

impl EtlContext {
    pub fn init(config: Config) -> Result<Self> {
        let log_guard = init_logging(&config)?;
        info!(
            "EPL ETL ({}) logging initialized: {}",
            config.profile.label(),
            config.log_dir.join(config.profile.log_file_name()).display()
        );

        let fetcher = FootballDataClient::new(config.api_base_url.clone(), config.api_key.clone())
            .context("Failed to create football-data client")?;
        let loader = PgLoader::new(config.database.clone());

        Ok(Self {
            pipeline: Pipeline::new(fetcher, loader),
            config,
            _log_guard: log_guard,
        })
    }

    pub fn pipeline(&self) -> &EtlPipeline {
        &self.pipeline
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            &self.config.trigger_times,
            Duration::from_secs(self.config.poll_interval_seconds),
        )
    }

    /// Flush and close the log sinks.
    pub fn shutdown(self) {
        info!("Shutting down EPL ETL ({})", self.config.profile.label());
        drop(self);
    }
}
