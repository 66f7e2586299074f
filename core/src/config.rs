//! Client configuration.

use std::time::Duration;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "SUBSET_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "SUBSET_API_TIMEOUT_SECS";

/// Where the API lives and how long a single request may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root including the version prefix, e.g. `http://localhost:8010/api/v1`.
    pub base_url: String,
    /// Per-request timeout; `None` leaves it to the transport's default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `SUBSET_API_BASE_URL` and the optional `SUBSET_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var(BASE_URL_VAR).map_err(|_| ConfigError::Missing(BASE_URL_VAR))?;
        if base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: BASE_URL_VAR,
                value: base_url,
            });
        }
        let timeout = match std::env::var(TIMEOUT_VAR) {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };
        Ok(Self { base_url, timeout })
    }
}
