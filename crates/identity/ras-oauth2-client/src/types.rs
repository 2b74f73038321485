//! OAuth2 protocol types.

use crate::error::OAuth2Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Request parameters, ordered so generated URLs and bodies are deterministic.
///
/// Merging two parameter sets with [`Extend`] lets the later set win.
pub type Parameters = BTreeMap<String, String>;

/// Inbound parameters of the provider's redirect back to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Callback carrying an authorization code obtained out of band.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Parse the query string of the redirect request (leading `?` optional).
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        params
    }

    /// Parse the full redirect URL the provider sent the user agent to.
    pub fn from_url(url: &str) -> OAuth2Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.is_empty())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|error| !error.is_empty())
    }
}
