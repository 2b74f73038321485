//! Authorization-code flow engine and token lifecycle.

use crate::clock::{Clock, SystemClock};
use crate::config::{ApplicationCredentials, EndpointConfig};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::store::{TokenStore, token_key};
use crate::tokens::{TokenResponse, TokenSet};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::types::{CallbackParams, Parameters};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Where a flow stands with respect to its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No access token.
    Unauthenticated,
    /// Access token present and not known to be renewable-expired.
    Authenticated,
    /// Access token past its computed expiry, with a refresh token to renew it.
    Expired,
}

/// Why [`OAuth2Flow::refresh_access_token`] did not contact the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSkipReason {
    NoAccessToken,
    NoRefreshToken,
    NotExpired,
}

/// Result of a refresh attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum RefreshOutcome {
    /// Renewal was unnecessary or impossible; no request was sent.
    Skipped(RefreshSkipReason),
    /// The provider issued a new access token, which has been persisted.
    Refreshed(TokenResponse),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// OAuth2 authorization-code client for a single provider session.
///
/// The flow exclusively owns its [`TokenSet`] and [`EndpointConfig`]; the
/// transport and token store are shared collaborators.
pub struct OAuth2Flow {
    provider_id: String,
    credentials: ApplicationCredentials,
    endpoints: EndpointConfig,
    tokens: TokenSet,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl OAuth2Flow {
    pub fn new(
        provider_id: impl Into<String>,
        credentials: ApplicationCredentials,
        endpoints: EndpointConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            credentials,
            endpoints,
            tokens: TokenSet::new(),
            transport,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn credentials(&self) -> &ApplicationCredentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub fn storage_key(&self) -> String {
        token_key(&self.provider_id)
    }

    /// Validate configuration and restore any previously persisted tokens.
    pub async fn initialize(&mut self) -> OAuth2Result<FlowState> {
        self.credentials.validate(&self.provider_id)?;
        self.endpoints.validate()?;

        match self.store.get(&self.storage_key()).await? {
            Some(tokens) => {
                self.tokens = tokens;
                info!(
                    provider_id = %self.provider_id,
                    state = ?self.state(),
                    "Restored persisted tokens"
                );
            }
            None => {
                debug!(provider_id = %self.provider_id, "No persisted tokens found");
            }
        }

        Ok(self.state())
    }

    pub fn state(&self) -> FlowState {
        if !self.tokens.has_access_token() {
            FlowState::Unauthenticated
        } else if self.tokens.has_refresh_token() && self.tokens.is_expired_at(self.clock.now()) {
            FlowState::Expired
        } else {
            FlowState::Authenticated
        }
    }

    /// True when an access token is held. Expiry is not considered.
    pub fn is_authorized(&self) -> bool {
        self.tokens.has_access_token()
    }

    /// Build the provider authorize URL.
    ///
    /// Parameters are merged with later sources winning: the defaults
    /// (`client_id`, `redirect_uri`, `scope`, `response_type=code`), then the
    /// endpoint's fixed authorize parameters, then `parameters`.
    pub fn generate_authorize_uri(&self, parameters: &Parameters) -> OAuth2Result<String> {
        let mut merged = Parameters::from([
            (
                "client_id".to_string(),
                self.credentials.application_id.clone(),
            ),
            (
                "redirect_uri".to_string(),
                self.endpoints.redirect_uri.clone(),
            ),
            ("scope".to_string(), self.credentials.scope.clone()),
            ("response_type".to_string(), "code".to_string()),
        ]);
        merged.extend(self.endpoints.authorize_uri_parameters.clone());
        merged.extend(parameters.clone());

        let mut url = Url::parse(&self.endpoints.authorize_uri)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &merged {
                query.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }

    /// First login step: the URL the caller should redirect the user to.
    /// Token state is not touched.
    pub fn login_begin(&self, parameters: &Parameters) -> OAuth2Result<String> {
        let url = self.generate_authorize_uri(parameters)?;
        info!(provider_id = %self.provider_id, "Generated authorization URL");
        Ok(url)
    }

    /// Second login step: consume the provider's redirect, exchange the
    /// code and persist the resulting tokens.
    pub async fn login_finish(
        &mut self,
        callback: &CallbackParams,
        parameters: &Parameters,
        method: HttpMethod,
    ) -> OAuth2Result<TokenResponse> {
        if let Some(provider_error) = callback.error() {
            warn!(
                provider_id = %self.provider_id,
                error = provider_error,
                "Provider returned an error on callback"
            );
            let reason = match callback.error_description.as_deref() {
                Some(description) if !description.is_empty() => {
                    format!("Provider returned an error: {provider_error} ({description})")
                }
                _ => format!("Provider returned an error: {provider_error}"),
            };
            return Err(OAuth2Error::authentication_failed(&self.provider_id, reason));
        }

        let code = callback.code().ok_or_else(|| {
            OAuth2Error::authentication_failed(&self.provider_id, "Missing authorization code")
        })?;

        let response = self
            .request_grant(self.authorization_code_parameters(code, parameters), method)
            .await?;

        if response.access_token().is_none() {
            error!(
                provider_id = %self.provider_id,
                "Token exchange returned no access token"
            );
            return Err(OAuth2Error::authentication_failed(
                &self.provider_id,
                "Provider returned an invalid access token",
            ));
        }

        self.tokens.apply_grant(&response, self.clock.now());
        self.persist_tokens().await?;

        info!(provider_id = %self.provider_id, "Login completed");
        Ok(response)
    }

    /// Exchange an authorization code for tokens and fold the fields present
    /// in the response into the working token set.
    ///
    /// Returns the full parsed response so callers can read provider extras.
    /// Nothing is persisted here.
    pub async fn exchange_code_for_tokens(
        &mut self,
        code: &str,
        parameters: &Parameters,
        method: HttpMethod,
    ) -> OAuth2Result<TokenResponse> {
        let response = self
            .request_grant(self.authorization_code_parameters(code, parameters), method)
            .await?;

        self.tokens.apply_grant(&response, self.clock.now());
        debug!(provider_id = %self.provider_id, "Exchanged authorization code");
        Ok(response)
    }

    /// Renew the access token with the refresh token.
    ///
    /// Unless `force` is set, no request is sent when there is no access
    /// token, no refresh token, or the access token has not reached its
    /// expiry. A response without an access token fails with
    /// [`OAuth2Error::AuthenticationFailed`]; the session is cleared only when
    /// the provider rejected the grant (a `4xx` status or an `error` field).
    pub async fn refresh_access_token(
        &mut self,
        parameters: &Parameters,
        method: HttpMethod,
        force: bool,
    ) -> OAuth2Result<RefreshOutcome> {
        let skip_reason = if force {
            None
        } else {
            self.refresh_skip_reason()
        };
        if let Some(reason) = skip_reason {
            debug!(provider_id = %self.provider_id, ?reason, "Skipping token refresh");
            return Ok(RefreshOutcome::Skipped(reason));
        }

        let mut request_parameters = Parameters::from([
            (
                "client_id".to_string(),
                self.credentials.application_id.clone(),
            ),
            (
                "client_secret".to_string(),
                self.credentials.application_secret.clone(),
            ),
            ("grant_type".to_string(), "refresh_token".to_string()),
        ]);
        if let Some(refresh_token) = self.tokens.refresh_token.as_ref() {
            request_parameters.insert("refresh_token".to_string(), refresh_token.clone());
        }
        request_parameters.extend(parameters.clone());

        let http_response = self.send_token_request(request_parameters, method).await?;
        let response = TokenResponse::parse(&http_response.body);

        if response.access_token().is_none() {
            let reason = match response.error() {
                Some(provider_error) => format!(
                    "Provider rejected the refresh grant (HTTP {}): {provider_error}",
                    http_response.status
                ),
                None => format!(
                    "Provider returned an invalid access/refresh token (HTTP {})",
                    http_response.status
                ),
            };
            // 4xx or a provider error ends the session; 5xx keeps it.
            let rejected =
                response.error().is_some() || (400..500).contains(&http_response.status);

            if rejected {
                warn!(
                    provider_id = %self.provider_id,
                    status = http_response.status,
                    "Token refresh rejected, clearing session"
                );
                self.tokens = TokenSet::new();
                if let Err(e) = self.store.delete(&self.storage_key()).await {
                    warn!(
                        provider_id = %self.provider_id,
                        error = %e,
                        "Failed to delete persisted tokens"
                    );
                }
            } else {
                warn!(
                    provider_id = %self.provider_id,
                    status = http_response.status,
                    "Token refresh failed, keeping session"
                );
            }

            return Err(OAuth2Error::authentication_failed(&self.provider_id, reason));
        }

        self.tokens.apply_refresh(&response, self.clock.now());
        self.persist_tokens().await?;

        info!(provider_id = %self.provider_id, "Refreshed access token");
        Ok(RefreshOutcome::Refreshed(response))
    }

    /// Call a provider resource with the current access token attached as
    /// the `access_token` parameter, returning the raw response body.
    ///
    /// Relative URIs resolve against the endpoint's base API URI. No refresh
    /// happens here; callers that need a fresh token refresh first.
    pub async fn signed_request(
        &self,
        uri: &str,
        method: HttpMethod,
        parameters: &Parameters,
    ) -> OAuth2Result<String> {
        let mut parameters = parameters.clone();
        if let Some(access_token) = self.tokens.access_token.as_ref() {
            parameters.insert("access_token".to_string(), access_token.clone());
        }

        let request = HttpRequest {
            method,
            url: self.endpoints.resolve(uri),
            parameters,
        };
        debug!(
            provider_id = %self.provider_id,
            method = %request.method,
            url = %request.url,
            "Sending signed request"
        );

        let response = self.transport.send(request).await?;
        if !(200..300).contains(&response.status) {
            warn!(
                provider_id = %self.provider_id,
                status = response.status,
                "Signed request returned a non-success status"
            );
        }

        Ok(response.body)
    }

    /// [`signed_request`](Self::signed_request) decoded as JSON.
    pub async fn api(
        &self,
        uri: &str,
        method: HttpMethod,
        parameters: &Parameters,
    ) -> OAuth2Result<serde_json::Value> {
        let body = self.signed_request(uri, method, parameters).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Forget the session: clears the working tokens and the persisted copy.
    pub async fn logout(&mut self) -> OAuth2Result<()> {
        self.tokens = TokenSet::new();
        self.store.delete(&self.storage_key()).await?;
        info!(provider_id = %self.provider_id, "Logged out");
        Ok(())
    }

    fn refresh_skip_reason(&self) -> Option<RefreshSkipReason> {
        if !self.tokens.has_access_token() {
            Some(RefreshSkipReason::NoAccessToken)
        } else if !self.tokens.has_refresh_token() {
            Some(RefreshSkipReason::NoRefreshToken)
        } else if !self.tokens.is_expired_at(self.clock.now()) {
            Some(RefreshSkipReason::NotExpired)
        } else {
            None
        }
    }

    fn authorization_code_parameters(&self, code: &str, parameters: &Parameters) -> Parameters {
        let mut merged = Parameters::from([
            (
                "client_id".to_string(),
                self.credentials.application_id.clone(),
            ),
            (
                "client_secret".to_string(),
                self.credentials.application_secret.clone(),
            ),
            ("grant_type".to_string(), "authorization_code".to_string()),
            (
                "redirect_uri".to_string(),
                self.endpoints.redirect_uri.clone(),
            ),
            ("code".to_string(), code.to_string()),
        ]);
        merged.extend(parameters.clone());
        merged
    }

    /// Token request that must answer `200`.
    async fn request_grant(
        &self,
        parameters: Parameters,
        method: HttpMethod,
    ) -> OAuth2Result<TokenResponse> {
        let response = self.send_token_request(parameters, method).await?;

        if !response.is_ok() {
            error!(
                provider_id = %self.provider_id,
                status = response.status,
                "Token request failed"
            );
            return Err(OAuth2Error::provider_http(
                &self.provider_id,
                response.status,
                &response.body,
            ));
        }

        Ok(TokenResponse::parse(&response.body))
    }

    async fn send_token_request(
        &self,
        parameters: Parameters,
        method: HttpMethod,
    ) -> OAuth2Result<HttpResponse> {
        let request = HttpRequest {
            method,
            url: self.endpoints.request_token_uri.clone(),
            parameters,
        };
        Ok(self.transport.send(request).await?)
    }

    async fn persist_tokens(&self) -> OAuth2Result<()> {
        self.store.set(&self.storage_key(), &self.tokens).await?;
        debug!(provider_id = %self.provider_id, "Persisted tokens");
        Ok(())
    }
}
