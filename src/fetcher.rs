//! Authenticated reads against football-data.org.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::EtlError;
use crate::models::Resource;

/// Competition code for the Premier League.
pub const COMPETITION: &str = "PL";

/// Anything that can return the parsed payload for a resource.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, resource: Resource) -> Result<Value, EtlError>;
}

/// football-data.org v4 client
pub struct FootballDataClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FootballDataClient {
    /// No retry and no timeout beyond reqwest's defaults: a failed read
    /// fails the run and the next trigger is the recovery path.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, EtlError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("epl-etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtlError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn url_for(&self, resource: Resource) -> String {
        format!(
            "{}/competitions/{}/{}",
            self.base_url,
            COMPETITION,
            resource.endpoint()
        )
    }
}

impl Fetcher for FootballDataClient {
    async fn fetch(&self, resource: Resource) -> Result<Value, EtlError> {
        let url = self.url_for(resource);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .map_err(|source| EtlError::Network { resource, source })?;

        // Log API usage from headers
        if let Some(remaining) = response.headers().get("x-requests-available-minute") {
            info!(
                "API requests available this minute: {}",
                remaining.to_str().unwrap_or("?")
            );
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| EtlError::Network { resource, source })?;

        if !status.is_success() {
            return Err(EtlError::Status {
                resource,
                status,
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| EtlError::data_shape(resource, format!("response body is not JSON: {}", e)))
    }
}
