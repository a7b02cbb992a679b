//! Startup configuration.
//!
//! Secrets/config:
//! - local runs: `.env` or plain env vars
//! - containers: API key and DB password may come from /run/secrets/*

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveTime;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";

/// Which of the two deployments this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    OnPrem,
    Cloud,
}

impl Profile {
    pub fn log_file_name(self) -> &'static str {
        match self {
            Profile::OnPrem => "epl_etl_log.txt",
            Profile::Cloud => "epl_cloud_etl_log.txt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Profile::OnPrem => "on-prem",
            Profile::Cloud => "cloud",
        }
    }

    fn default_ssl_mode(self) -> PgSslMode {
        match self {
            Profile::OnPrem => PgSslMode::Prefer,
            Profile::Cloud => PgSslMode::Require,
        }
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "on-prem" | "onprem" | "local" => Ok(Profile::OnPrem),
            "cloud" => Ok(Profile::Cloud),
            other => Err(anyhow!("unknown ETL_PROFILE '{}'", other)),
        }
    }
}

/// Configuration
#[derive(Clone)]
pub struct Config {
    pub profile: Profile,
    pub api_key: String,
    pub api_base_url: String,
    pub database: PgConnectOptions,
    pub trigger_times: Vec<NaiveTime>,
    pub poll_interval_seconds: u64,
    /// If true, run once and exit (no scheduling loop)
    pub run_once: bool,
    pub log_dir: PathBuf,
}

// Keeps the API key and password out of `{:?}` output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("profile", &self.profile)
            .field("api_base_url", &self.api_base_url)
            .field("database_host", &self.database.get_host())
            .field("database_name", &self.database.get_database())
            .field("trigger_times", &self.trigger_times)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("run_once", &self.run_once)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = match var("ETL_PROFILE") {
            Some(v) => v.parse()?,
            None => Profile::OnPrem,
        };

        let api_key = match var("FOOTBALL_DATA_API_KEY") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => bail!("FOOTBALL_DATA_API_KEY is set but empty"),
            None => read_secret_file("/run/secrets/football_data_api_key", "football_data_api_key")?,
        };

        // Prevent accidental use of sample/placeholder keys
        let key_lower = api_key.to_lowercase();
        if key_lower.contains("change_me") || key_lower.contains("your_") || key_lower.starts_with("sample") {
            bail!("FOOTBALL_DATA_API_KEY appears to be a placeholder value; replace with your real key");
        }

        let api_base_url = var("FOOTBALL_DATA_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let database = database_options(profile, &var)?;

        let trigger_times = parse_trigger_times(
            &var("ETL_TRIGGER_TIMES").unwrap_or_else(|| "08:00,20:00".to_string()),
        )?;

        let poll_interval_seconds = match var("ETL_POLL_INTERVAL_SECONDS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("ETL_POLL_INTERVAL_SECONDS must be a number, got '{}'", v))?,
            None => 60,
        };
        if poll_interval_seconds == 0 {
            bail!("ETL_POLL_INTERVAL_SECONDS must be greater than zero");
        }

        Ok(Self {
            profile,
            api_key,
            api_base_url,
            database,
            trigger_times,
            poll_interval_seconds,
            run_once: var("RUN_ONCE")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_dir: var("ETL_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

/// DATABASE_URL wins; otherwise the connection is assembled from DB_* parts.
fn database_options<F>(profile: Profile, var: &F) -> Result<PgConnectOptions>
where
    F: Fn(&str) -> Option<String>,
{
    let configured = match var("DB_SSLMODE") {
        Some(v) => Some(
            PgSslMode::from_str(v.trim())
                .with_context(|| format!("DB_SSLMODE '{}' is not a valid sslmode", v))?,
        ),
        None => None,
    };

    if let Some(url) = var("DATABASE_URL") {
        let url = url.trim();
        if url.is_empty() {
            bail!("DATABASE_URL is set but empty");
        }
        let options = PgConnectOptions::from_str(url).context("DATABASE_URL is not a valid Postgres URL")?;
        return Ok(match url_ssl_override(url, configured, profile) {
            Some(mode) => options.ssl_mode(mode),
            None => options,
        });
    }

    let ssl_mode = configured.unwrap_or_else(|| profile.default_ssl_mode());

    let port = match var("DB_PORT") {
        Some(v) => v
            .trim()
            .parse::<u16>()
            .with_context(|| format!("DB_PORT must be a port number, got '{}'", v))?,
        None => 5432,
    };
    let password = match var("DB_PASSWORD") {
        Some(v) => v,
        None => read_secret_file("/run/secrets/db_password", "db_password")?,
    };

    Ok(PgConnectOptions::new()
        .host(&var("DB_HOST").unwrap_or_else(|| "localhost".to_string()))
        .port(port)
        .username(&var("DB_USER").unwrap_or_else(|| "postgres".to_string()))
        .password(&password)
        .database(&var("DB_NAME").unwrap_or_else(|| "epl".to_string()))
        .ssl_mode(ssl_mode))
}

/// sslmode to force onto a DATABASE_URL connection.
///
/// DB_SSLMODE always wins. Otherwise an sslmode in the URL is kept, and a URL
/// without one gets the profile default (`require` for cloud).
fn url_ssl_override(url: &str, configured: Option<PgSslMode>, profile: Profile) -> Option<PgSslMode> {
    if configured.is_some() {
        return configured;
    }
    let has_sslmode = url
        .split_once('?')
        .map(|(_, query)| {
            query
                .split('&')
                .any(|pair| matches!(pair.split('=').next(), Some("sslmode" | "ssl-mode")))
        })
        .unwrap_or(false);
    if has_sslmode {
        None
    } else {
        Some(profile.default_ssl_mode())
    }
}

/// Parse "HH:MM,HH:MM" into sorted, de-duplicated trigger times.
pub fn parse_trigger_times(raw: &str) -> Result<Vec<NaiveTime>> {
    let mut times = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .with_context(|| format!("invalid trigger time '{}', expected HH:MM", s))
        })
        .collect::<Result<Vec<_>>>()?;

    if times.is_empty() {
        bail!("ETL_TRIGGER_TIMES must list at least one HH:MM time");
    }
    times.sort();
    times.dedup();
    Ok(times)
}

/// Read a secret from a Docker secret file
fn read_secret_file(file_path: &str, secret_name: &str) -> Result<String> {
    std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .with_context(|| {
            format!(
                "{} not provided: set it in the environment or mount {}",
                secret_name, file_path
            )
        })
}
