//! Configuration for the OAuth2 command-line client
//!
//! Sources, later ones taking precedence:
//! - Default values
//! - Configuration file (`ras-oauth2.toml`, or the path given with `--config`)
//! - Environment variables prefixed with `RAS_OAUTH2__`, using `__` for
//!   nesting, e.g. `RAS_OAUTH2__CREDENTIALS__APPLICATION_SECRET`

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use ras_oauth2_client::{
    ApplicationCredentials, FileTokenStore, ProviderOptions, ReqwestTransport, TransportConfig,
};
use ras_oauth2_providers::{FacebookAdapter, GoogleAdapter, ProviderAdapter, ProviderSession};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "ras-oauth2.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Google,
    Facebook,
}

impl ProviderKind {
    pub fn adapter(&self) -> Arc<dyn ProviderAdapter> {
        match self {
            ProviderKind::Google => Arc::new(GoogleAdapter::new()),
            ProviderKind::Facebook => Arc::new(FacebookAdapter::new()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Facebook => write!(f, "facebook"),
        }
    }
}

/// Main configuration struct for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Identity provider to talk to
    pub provider: ProviderKind,

    /// Application registration with the provider
    pub credentials: ApplicationCredentials,

    /// Login options, `redirect_uri` is required
    pub options: ProviderOptions,

    /// JSON file the tokens are persisted to
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// HTTP timeouts and user agent
    pub transport: TransportConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_token_file() -> PathBuf {
    PathBuf::from("./oauth2_tokens.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            credentials: ApplicationCredentials::new("", ""),
            options: ProviderOptions::default(),
            token_file: default_token_file(),
            transport: TransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Load configuration from the given file (or the default file if it
    /// exists) and the environment, then validate it.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
        }

        builder = builder.add_source(
            Environment::with_prefix("RAS_OAUTH2")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let settings: CliConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.credentials
            .validate(&self.provider.to_string())
            .context("application_id and application_secret must be configured")?;

        if self
            .options
            .redirect_uri
            .as_deref()
            .is_none_or(|uri| uri.trim().is_empty())
        {
            anyhow::bail!("options.redirect_uri must be configured");
        }

        if self.token_file.as_os_str().is_empty() {
            anyhow::bail!("token_file cannot be empty");
        }

        if self.transport.timeout_secs == 0 || self.transport.connect_timeout_secs == 0 {
            anyhow::bail!("Transport timeouts must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }

    /// Session for the configured provider, persisting to `token_file`.
    pub fn build_session(&self) -> Result<ProviderSession> {
        let transport =
            ReqwestTransport::new(&self.transport).context("Failed to build HTTP client")?;

        let session = ProviderSession::new(
            self.provider.adapter(),
            self.credentials.clone(),
            self.options.clone(),
            Arc::new(transport),
            Arc::new(FileTokenStore::new(&self.token_file)),
        )?;

        Ok(session)
    }
}
