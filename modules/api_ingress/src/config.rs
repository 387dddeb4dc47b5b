use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP listener configuration, derived from the `server` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long in-flight requests may run after shutdown starts.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
    #[serde(default)]
    pub cors_enabled: bool,
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_string(),
            request_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(30),
            cors_enabled: false,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl From<&runtime::AppConfig> for ApiIngressConfig {
    fn from(cfg: &runtime::AppConfig) -> Self {
        Self {
            bind_addr: cfg.bind_addr(),
            request_timeout: Duration::from_secs(cfg.server.timeout_sec),
            shutdown_grace: cfg.server.shutdown_grace,
            cors_enabled: cfg.server.cors_enabled,
            body_limit_bytes: cfg.server.body_limit_bytes,
        }
    }
}
