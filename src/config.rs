//! Configuration file loading
//!
//! A gather configuration is a YAML (or JSON) document with three optional
//! sections:
//!
//! ```yaml
//! http:
//!   base_url: https://gitlab.com/api/v4
//!   private_token: ${GITLAB_TOKEN}
//!   timeout: 30
//!   max_retries: 3
//!   rate_limit:
//!     requests_per_second: 30
//!     burst_size: 10
//! gather:
//!   workers_cap: 8
//!   total_pages_limit: 100
//! query_defaults:
//!   per_page: 100
//!   owned: true
//! ```
//!
//! `${VAR}` references in the token and header values are expanded from the
//! environment.

use crate::error::{Error, Result, ResultExt};
use crate::gather::GatherConfig;
use crate::http::HttpClientConfig;
use crate::query::QueryDefaults;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;

/// Regex for matching environment references: ${VAR_NAME}
static ENV_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Complete configuration loaded from a file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// HTTP client settings
    pub http: HttpClientConfig,
    /// Pipeline capacities and page ceiling
    pub gather: GatherConfig,
    /// Default listing parameters for seed queries
    pub query_defaults: QueryDefaults,
}

impl FileConfig {
    /// Load a config file, choosing the parser by extension
    ///
    /// `.json` files are read as JSON, everything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.expanded()
    }

    /// Parse a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.expanded()
    }

    fn expanded(mut self) -> Result<Self> {
        if let Some(token) = &self.http.private_token {
            self.http.private_token = Some(expand_env(token)?);
        }
        for value in self.http.default_headers.values_mut() {
            *value = expand_env(value)?;
        }
        Ok(self)
    }
}

/// Replace `${VAR}` references with environment values
pub fn expand_env(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut last = 0;

    for caps in ENV_REGEX.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        let value = std::env::var(name).map_err(|_| {
            Error::invalid_value(name, "environment variable is not set")
        })?;
        result.push_str(&input[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&input[last..]);
    Ok(result)
}
