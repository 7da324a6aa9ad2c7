//! Runtime configuration for the latency bench.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags
//! 2. TOML file passed with `--config`
//! 3. Environment variables
//! 4. Built-in defaults
//!
//! | Key             | Env var                 | Default                                   |
//! |-----------------|-------------------------|-------------------------------------------|
//! | `database_url`  | `NEON_DATABASE_URL`     | none (required to run)                    |
//! | `http_endpoint` | `LATENCY_HTTP_ENDPOINT` | `https://<db host>/sql`                   |
//! | `ws_endpoint`   | `LATENCY_WS_ENDPOINT`   | `wss://<db host>/v2?address=<host>:<port>`|
//! | `queries`       | (none)                  | 1                                         |
//! | `samples`       | (none)                  | 50                                        |

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;

const ENV_DATABASE_URL: &str = "NEON_DATABASE_URL";
const ENV_HTTP_ENDPOINT: &str = "LATENCY_HTTP_ENDPOINT";
const ENV_WS_ENDPOINT: &str = "LATENCY_WS_ENDPOINT";

const DEFAULT_QUERIES: u32 = 1;
const DEFAULT_SAMPLES: usize = 50;
const DEFAULT_PG_PORT: u16 = 5432;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Postgres connection string shared by every strategy.
    pub database_url: Option<String>,
    /// Explicit SQL-over-HTTP endpoint; derived from the database host if unset.
    pub http_endpoint: Option<String>,
    /// Explicit WebSocket proxy endpoint; derived from the database host if unset.
    pub ws_endpoint: Option<String>,
    pub queries: u32,
    pub samples: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            http_endpoint: None,
            ws_endpoint: None,
            queries: DEFAULT_QUERIES,
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Optional overrides read from a TOML file. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub http_endpoint: Option<String>,
    pub ws_endpoint: Option<String>,
    pub queries: Option<u32>,
    pub samples: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

impl BenchConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: env::var(ENV_DATABASE_URL).ok().filter(|v| !v.is_empty()),
            http_endpoint: env::var(ENV_HTTP_ENDPOINT).ok().filter(|v| !v.is_empty()),
            ws_endpoint: env::var(ENV_WS_ENDPOINT).ok().filter(|v| !v.is_empty()),
            ..Self::default()
        }
    }

    /// Environment, then the optional file on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env();
        if let Some(path) = path {
            config.apply_file(FileConfig::load(path)?);
        }
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if file.database_url.is_some() {
            self.database_url = file.database_url;
        }
        if file.http_endpoint.is_some() {
            self.http_endpoint = file.http_endpoint;
        }
        if file.ws_endpoint.is_some() {
            self.ws_endpoint = file.ws_endpoint;
        }
        if let Some(queries) = file.queries {
            self.queries = queries;
        }
        if let Some(samples) = file.samples {
            self.samples = samples;
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!("no database URL configured; set {ENV_DATABASE_URL} or database_url"),
        }
    }

    pub fn resolved_http_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.http_endpoint {
            return Ok(endpoint.clone());
        }
        let (host, _) = database_host(self.require_database_url()?)?;
        Ok(format!("https://{host}/sql"))
    }

    pub fn resolved_ws_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.ws_endpoint {
            return Ok(endpoint.clone());
        }
        let (host, port) = database_host(self.require_database_url()?)?;
        Ok(format!("wss://{host}/v2?address={host}:{port}"))
    }
}

/// Host and port of a `postgres://` connection string.
fn database_host(database_url: &str) -> Result<(String, u16)> {
    let url = Url::parse(database_url).context("database URL is not a valid URL")?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .context("database URL has no host")?
        .to_string();
    Ok((host, url.port().unwrap_or(DEFAULT_PG_PORT)))
}
