//! One ETL run: standings, then scorers, then fixtures.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::EtlError;
use crate::fetcher::Fetcher;
use crate::loader::Loader;
use crate::models::Resource;
use crate::transform::{records, transform_batch};

/// Position in the run's linear state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch(Resource),
    Transform(Resource),
    Load(Resource),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch(r) => write!(f, "fetch {}", r),
            Stage::Transform(r) => write!(f, "transform {}", r),
            Stage::Load(r) => write!(f, "load {}", r),
        }
    }
}

/// A run that stopped at `stage`; earlier stages stay committed.
#[derive(Debug, Error)]
#[error("run {run_id} failed at {stage}: {source}")]
pub struct RunError {
    pub run_id: Uuid,
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Rows upserted per resource, in run order
    pub loaded: Vec<(Resource, u64)>,
}

impl RunReport {
    pub fn total_rows(&self) -> u64 {
        self.loaded.iter().map(|(_, n)| n).sum()
    }
}

/// Fetch → transform → load for every resource, strictly in sequence.
pub struct Pipeline<F, L> {
    fetcher: F,
    loader: L,
}

impl<F: Fetcher, L: Loader> Pipeline<F, L> {
    pub fn new(fetcher: F, loader: L) -> Self {
        Self { fetcher, loader }
    }

    #[cfg(test)]
    pub(crate) fn loader(&self) -> &L {
        &self.loader
    }

    /// Execute one run. No state is carried between runs.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut loaded = Vec::with_capacity(Resource::ALL.len());

        for resource in Resource::ALL {
            let fail = |stage: Stage| move |source: EtlError| RunError { run_id, stage, source };

            let payload = self
                .fetcher
                .fetch(resource)
                .await
                .map_err(fail(Stage::Fetch(resource)))?;

            let batch = records(resource, &payload)
                .and_then(|list| transform_batch(resource, list))
                .map_err(fail(Stage::Transform(resource)))?;
            info!("[{}] Fetched {} {} records", run_id, batch.len(), resource);

            let count = self
                .loader
                .load(&batch)
                .await
                .map_err(fail(Stage::Load(resource)))?;
            info!("[{}] {} updated successfully: {} rows", run_id, resource, count);

            loaded.push((resource, count));
        }

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            loaded,
        })
    }

    /// Run and log the outcome. Failures are contained here so the
    /// scheduler keeps going.
    pub async fn run_logged(&self) -> Option<RunReport> {
        info!("Scheduled ETL started");

        match self.run().await {
            Ok(report) => {
                info!(
                    "[{}] SUCCESS: all EPL tables updated ({} rows in {}ms)",
                    report.run_id,
                    report.total_rows(),
                    (report.finished_at - report.started_at).num_milliseconds()
                );
                Some(report)
            }
            Err(e) => {
                error!("[{}] ETL run failed at {}: {}", e.run_id, e.stage, e.source);
                None
            }
        }
    }
}
