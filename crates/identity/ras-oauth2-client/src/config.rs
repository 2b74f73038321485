//! OAuth2 configuration types.

use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::Parameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Application registration with the identity provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApplicationCredentials {
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub application_secret: String,
    /// Space or comma separated scope string, in the provider's own syntax.
    #[serde(default)]
    pub scope: String,
}

impl fmt::Debug for ApplicationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationCredentials")
            .field("application_id", &self.application_id)
            .field("application_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

impl ApplicationCredentials {
    pub fn new(application_id: impl Into<String>, application_secret: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            application_secret: application_secret.into(),
            scope: String::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn validate(&self, provider_id: &str) -> OAuth2Result<()> {
        if self.application_id.trim().is_empty() || self.application_secret.trim().is_empty() {
            return Err(OAuth2Error::MissingCredentials {
                provider_id: provider_id.to_string(),
            });
        }
        Ok(())
    }
}

/// Static endpoint configuration for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub authorize_uri: String,
    pub request_token_uri: String,
    /// Prefix for relative resource URIs passed to signed requests.
    pub base_api_uri: String,
    /// Must match the redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Provider-specific extras added to every authorize URL
    #[serde(default)]
    pub authorize_uri_parameters: Parameters,
    #[serde(default)]
    pub token_info_uri: Option<String>,
}

impl EndpointConfig {
    pub fn new(
        authorize_uri: impl Into<String>,
        request_token_uri: impl Into<String>,
        base_api_uri: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authorize_uri: authorize_uri.into(),
            request_token_uri: request_token_uri.into(),
            base_api_uri: base_api_uri.into(),
            redirect_uri: redirect_uri.into(),
            authorize_uri_parameters: Parameters::new(),
            token_info_uri: None,
        }
    }

    pub fn with_authorize_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorize_uri_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_token_info_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_info_uri = Some(uri.into());
        self
    }

    pub fn validate(&self) -> OAuth2Result<()> {
        for (name, uri) in [
            ("authorize_uri", &self.authorize_uri),
            ("request_token_uri", &self.request_token_uri),
        ] {
            Url::parse(uri)
                .map_err(|e| OAuth2Error::InvalidConfig(format!("{name} '{uri}': {e}")))?;
        }

        if self.redirect_uri.trim().is_empty() {
            return Err(OAuth2Error::InvalidConfig(
                "redirect_uri must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve a resource URI: absolute `http(s)://` URIs are used as-is,
    /// anything else is appended to `base_api_uri`.
    pub fn resolve(&self, uri: &str) -> String {
        let is_absolute = Url::parse(uri)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if is_absolute {
            return uri.to_string();
        }

        let base = self.base_api_uri.trim_end_matches('/');
        let path = uri.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Recognized per-provider login options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    pub scope: Option<String>,
    /// `offline` asks Google for a refresh token
    pub access_type: Option<String>,
    pub redirect_uri: Option<String>,
    /// `force` makes Google re-prompt for consent
    pub approval_prompt: Option<String>,
    /// Facebook dialog display mode
    pub display: Option<String>,
    pub contacts_max_results: Option<u32>,
    /// Provider-specific authorize parameters not covered above
    pub extra: Parameters,
}

impl ProviderOptions {
    /// Authorize URL parameters derived from the options that are set.
    pub fn login_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();

        for (key, value) in [
            ("scope", &self.scope),
            ("access_type", &self.access_type),
            ("redirect_uri", &self.redirect_uri),
            ("approval_prompt", &self.approval_prompt),
            ("display", &self.display),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                parameters.insert(key.to_string(), value.to_string());
            }
        }

        parameters.extend(self.extra.clone());
        parameters
    }
}
