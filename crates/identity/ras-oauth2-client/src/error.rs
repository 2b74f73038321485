//! OAuth2 error types.

use crate::store::StoreError;
use crate::transport::TransportError;
use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Longest slice of a provider response body kept for diagnostics.
const MAX_BODY_SNIPPET: usize = 512;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("Application credentials are missing for provider {provider_id}")]
    MissingCredentials { provider_id: String },

    #[error("Authentication failed for provider {provider_id}: {reason}")]
    AuthenticationFailed { provider_id: String, reason: String },

    #[error("Provider {provider_id} returned HTTP error ({status}): {body}")]
    ProviderHttpError {
        provider_id: String,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Token store error: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("User profile request failed for provider {provider_id}: {reason}")]
    ProfileRequestFailed { provider_id: String, reason: String },
}

impl OAuth2Error {
    pub fn authentication_failed(provider_id: &str, reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            provider_id: provider_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn provider_http(provider_id: &str, status: u16, body: &str) -> Self {
        Self::ProviderHttpError {
            provider_id: provider_id.to_string(),
            status,
            body: body.chars().take(MAX_BODY_SNIPPET).collect(),
        }
    }

    pub fn profile_request_failed(provider_id: &str, reason: impl Into<String>) -> Self {
        Self::ProfileRequestFailed {
            provider_id: provider_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Provider the failure belongs to, when the error is provider-scoped.
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::MissingCredentials { provider_id }
            | Self::AuthenticationFailed { provider_id, .. }
            | Self::ProviderHttpError { provider_id, .. }
            | Self::ProfileRequestFailed { provider_id, .. } => Some(provider_id),
            _ => None,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProviderHttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
