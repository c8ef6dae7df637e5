//! Ambient client configuration: where to find the default solver, default
//! parameters applied before any CLI/API overrides, and logging setup.
//!
//! Loaded from (later sources win):
//! 1. `optalcp-client.toml` (checked into a project, if present)
//! 2. `optalcp-client.local.toml` (git-ignored local overrides)
//! 3. Environment variables prefixed `OPTALCP_CLIENT_`
//!
//! This is distinct from the `OPTALCP_SOLVER`/`OPTALCP_MODEL` environment
//! variables read directly by [`crate::solver::discovery`] and
//! [`crate::serialize`]: those are per-call overrides specified by the wire
//! protocol itself, while `ClientConfig` holds the defaults a long-lived
//! process loads once at startup.
//!
//! ```bash
//! OPTALCP_CLIENT_SOLVER__PATH=/opt/optalcp/bin/optalcp
//! OPTALCP_CLIENT_LOGGING__LEVEL=debug
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::params::Parameters;

const CONFIG_FILE: &str = "optalcp-client.toml";
const LOCAL_CONFIG_FILE: &str = "optalcp-client.local.toml";
const ENV_PREFIX: &str = "OPTALCP_CLIENT_";

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    /// Applied as the base layer under [`crate::params::merge_parameters`];
    /// a per-call `Parameters` passed by the caller overrides these.
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default solver endpoint, used only when neither an explicit `parameters.solver`
/// nor the `OPTALCP_SOLVER` environment variable is set; see
/// [`crate::solver::discovery::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Logging configuration: which `tracing` filter directive to install and
/// whether to render compact text or structured JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

fn default_log_level() -> String {
    "optalcp_client=info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ClientConfig {
    /// Merge `optalcp-client.toml`, `optalcp-client.local.toml` and
    /// `OPTALCP_CLIENT_*` environment variables over the built-in defaults.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(ClientConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Toml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load from one explicit file, still honoring environment overrides.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(ClientConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Install a `tracing-subscriber` formatter honoring [`LoggingConfig`].
    /// `RUST_LOG`, if set, always wins over the configured level.
    pub fn init_tracing(&self) {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone());
        let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
        match self.logging.format {
            LogFormat::Text => {
                builder.compact().init();
            }
            LogFormat::Json => {
                builder.json().init();
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            solver: SolverConfig::default(),
            parameters: Parameters::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_text_logging_at_info() {
        let config = ClientConfig::default();
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.solver.path.is_none());
    }

    #[test]
    fn from_file_applies_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [solver]
            path = "/opt/optalcp/bin/optalcp"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        let config = ClientConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.solver.path.as_deref(), Some("/opt/optalcp/bin/optalcp"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
