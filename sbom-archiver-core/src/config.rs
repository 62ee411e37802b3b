//! Process configuration read from the environment.
//!
//! Two settings are required: the store connection string and the oracle
//! credential. Everything else has a default. Loading fails fast with a
//! [`ConfigError`] so the process never starts half-configured.
//!
//! # API pattern
//!
//! - [`Settings::from_lookup`]: explicit lookup function; used in tests
//! - [`Settings::from_env`]: reads `std::env`, delegates to `from_lookup`

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const STORE_URL_VAR: &str = "SBOM_ARCHIVER_STORE_URL";
pub const ORACLE_TOKEN_VAR: &str = "SBOM_ARCHIVER_ORACLE_TOKEN";
pub const ORACLE_BASE_URL_VAR: &str = "SBOM_ARCHIVER_ORACLE_BASE_URL";
pub const ORACLE_API_VERSION_VAR: &str = "SBOM_ARCHIVER_ORACLE_API_VERSION";
pub const ORACLE_AUTH_VAR: &str = "SBOM_ARCHIVER_ORACLE_AUTH";
pub const INTERVAL_SECS_VAR: &str = "SBOM_ARCHIVER_INTERVAL_SECS";
pub const MAX_CONCURRENT_VAR: &str = "SBOM_ARCHIVER_MAX_CONCURRENT_CHECKS";
pub const REQUEST_TIMEOUT_SECS_VAR: &str = "SBOM_ARCHIVER_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_ORACLE_BASE_URL: &str = "https://vsrm.dev.azure.com";
pub const DEFAULT_API_VERSION: &str = "7.1";
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 4;
pub const MAX_CONCURRENT_CHECKS_LIMIT: u64 = 256;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the oracle credential is presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Basic base64(":" + token)`: personal access tokens.
    #[default]
    Basic,
    /// `Bearer <token>`
    Bearer,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!(
                "unknown auth scheme '{other}'; expected: basic, bearer"
            )),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Bearer => f.write_str("bearer"),
        }
    }
}

/// Everything the archiver needs to run.
#[derive(Clone)]
pub struct Settings {
    pub store_url: String,
    pub oracle_token: String,
    pub oracle_base_url: String,
    pub api_version: String,
    pub auth_scheme: AuthScheme,
    pub cycle_interval: Duration,
    pub max_concurrent_checks: usize,
    pub request_timeout: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("store_url", &self.store_url)
            .field("oracle_token", &"<redacted>")
            .field("oracle_base_url", &self.oracle_base_url)
            .field("api_version", &self.api_version)
            .field("auth_scheme", &self.auth_scheme)
            .field("cycle_interval", &self.cycle_interval)
            .field("max_concurrent_checks", &self.max_concurrent_checks)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store_url = get(STORE_URL_VAR).ok_or(ConfigError::Missing {
            name: STORE_URL_VAR,
        })?;
        let oracle_token = get(ORACLE_TOKEN_VAR).ok_or(ConfigError::Missing {
            name: ORACLE_TOKEN_VAR,
        })?;

        let auth_scheme = match get(ORACLE_AUTH_VAR) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: ORACLE_AUTH_VAR,
                value: raw,
                reason,
            })?,
            None => AuthScheme::default(),
        };

        let cycle_interval = match get(INTERVAL_SECS_VAR) {
            Some(raw) => Duration::from_secs(parse_positive(INTERVAL_SECS_VAR, &raw)?),
            None => DEFAULT_CYCLE_INTERVAL,
        };
        let max_concurrent_checks = match get(MAX_CONCURRENT_VAR) {
            Some(raw) => {
                parse_bounded(MAX_CONCURRENT_VAR, &raw, MAX_CONCURRENT_CHECKS_LIMIT)? as usize
            }
            None => DEFAULT_MAX_CONCURRENT_CHECKS,
        };
        let request_timeout = match get(REQUEST_TIMEOUT_SECS_VAR) {
            Some(raw) => Duration::from_secs(parse_positive(REQUEST_TIMEOUT_SECS_VAR, &raw)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            store_url,
            oracle_token,
            oracle_base_url: get(ORACLE_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_ORACLE_BASE_URL.to_string()),
            api_version: get(ORACLE_API_VERSION_VAR)
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            auth_scheme,
            cycle_interval,
            max_concurrent_checks,
            request_timeout,
        })
    }
}

/// Read only the store connection string. Used by tooling that never talks to the oracle.
pub fn store_url_from_env() -> Result<String, ConfigError> {
    std::env::var(STORE_URL_VAR)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing {
            name: STORE_URL_VAR,
        })
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: u64 = raw.parse().map_err(|_| invalid("expected a whole number"))?;
    if value == 0 {
        return Err(invalid("must be at least 1"));
    }
    Ok(value)
}

fn parse_bounded(name: &'static str, raw: &str, max: u64) -> Result<u64, ConfigError> {
    let value = parse_positive(name, raw)?;
    if value > max {
        return Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: format!("must be at most {max}"),
        });
    }
    Ok(value)
}
