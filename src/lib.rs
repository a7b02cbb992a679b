//! EPL ETL Service
//!
//! Pulls Premier League standings, top scorers and fixtures from
//! football-data.org and upserts them into Postgres at fixed times of day.

pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod transform;

#[cfg(test)]
mod testing;

pub use config::{Config, Profile};
pub use context::EtlContext;
pub use error::EtlError;
pub use fetcher::{Fetcher, FootballDataClient};
pub use loader::{Loader, PgLoader};
pub use models::*;
pub use pipeline::{Pipeline, RunError, RunReport, Stage};
pub use scheduler::{ScheduledJob, Scheduler, Trigger};
