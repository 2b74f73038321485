use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ras_oauth2_client::{CallbackParams, HttpMethod, Parameters, RefreshOutcome};
use std::path::PathBuf;

/// Log in to an OAuth2 identity provider and query the user's data
#[derive(Debug, Parser)]
#[command(name = "ras-oauth2")]
#[command(about = "Log in to an OAuth2 identity provider and query the user's data")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Configuration file (TOML); defaults to ./ras-oauth2.toml when present
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the URL to open in a browser to start the login
    AuthorizeUrl,

    /// Complete the login with the code the provider redirected back with
    Finish {
        /// Authorization code
        #[arg(long, required_unless_present = "callback_url")]
        code: Option<String>,

        /// Full redirect URL, including its `code` or `error` query parameters
        #[arg(long, conflicts_with = "code")]
        callback_url: Option<String>,
    },

    /// Renew the access token if it has expired
    Refresh {
        /// Send the refresh request even if the token is still valid
        #[arg(short, long)]
        force: bool,
    },

    /// Print the user's profile as JSON
    Profile,

    /// Print the user's contacts as JSON
    Contacts,

    /// Show whether a session is stored and when it expires
    Status,

    /// Forget the stored session
    Logout,
}

impl Args {
    /// Load the configuration and run the command.
    pub async fn run(&self) -> Result<String> {
        let config = CliConfig::load(self.config.as_deref())?;
        self.execute(&config).await
    }

    /// Run the command against an already loaded configuration, returning
    /// the text to print.
    pub async fn execute(&self, config: &CliConfig) -> Result<String> {
        let mut session = config.build_session()?;
        session
            .initialize()
            .await
            .context("Failed to initialize session")?;

        let provider = config.provider;

        match &self.command {
            Command::AuthorizeUrl => Ok(session.login_begin()?),
            Command::Finish { code, callback_url } => {
                let callback = match (code, callback_url) {
                    (_, Some(url)) => CallbackParams::from_url(url)?,
                    (Some(code), None) => CallbackParams::with_code(code.as_str()),
                    (None, None) => anyhow::bail!("Either --code or --callback-url is required"),
                };
                session.login_finish(&callback).await?;
                Ok(format!("Logged in to {provider}"))
            }
            Command::Refresh { force } => {
                let outcome = session
                    .flow_mut()
                    .refresh_access_token(&Parameters::new(), HttpMethod::Post, *force)
                    .await?;
                match outcome {
                    RefreshOutcome::Refreshed(_) => Ok("Access token refreshed".to_string()),
                    RefreshOutcome::Skipped(reason) => Ok(format!("Refresh skipped: {reason:?}")),
                }
            }
            Command::Profile => {
                let profile = session.get_user_profile().await?;
                Ok(serde_json::to_string_pretty(&profile)?)
            }
            Command::Contacts => {
                let contacts = session.get_user_contacts().await?;
                Ok(serde_json::to_string_pretty(&contacts)?)
            }
            Command::Status => {
                let tokens = session.flow().tokens();
                let mut lines = vec![
                    format!("provider: {provider}"),
                    format!("state: {:?}", session.state()),
                    format!("refresh token: {}", tokens.has_refresh_token()),
                ];
                if let Some(expires_at) = tokens.access_token_expires_at {
                    lines.push(format!("expires at: {}", expires_at.to_rfc3339()));
                }
                Ok(lines.join("\n"))
            }
            Command::Logout => {
                session.logout().await?;
                Ok(format!("Logged out of {provider}"))
            }
        }
    }
}
