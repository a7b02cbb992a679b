use reqwest::StatusCode;
use thiserror::Error;

use crate::models::Resource;

/// Errors raised by the fetch, transform and load stages.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Transport-level failure talking to football-data.org
    #[error("request for {resource} failed: {source}")]
    Network {
        resource: Resource,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("football-data API error for {resource} (status {status}): {body}")]
    Status {
        resource: Resource,
        status: StatusCode,
        body: String,
    },

    /// A payload or record did not have the expected structure
    #[error("unexpected {resource} payload: {message}")]
    DataShape { resource: Resource, message: String },

    /// Connection or statement failure while loading a table
    #[error("loading table {table} failed: {source}")]
    Storage {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    pub fn data_shape(resource: Resource, message: impl Into<String>) -> Self {
        Self::DataShape {
            resource,
            message: message.into(),
        }
    }

    pub fn storage(resource: Resource, source: sqlx::Error) -> Self {
        Self::Storage {
            table: resource.table(),
            source,
        }
    }

    /// True for the errors the base design calls NetworkError.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Status { .. })
    }
}
