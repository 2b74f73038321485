//! One provider adapter driven over one generic OAuth2 flow.

use crate::adapter::ProviderAdapter;
use crate::profile::{UserContact, UserProfile};
use ras_oauth2_client::{
    ApplicationCredentials, CallbackParams, Clock, FlowState, HttpMethod, HttpTransport,
    OAuth2Error, OAuth2Flow, OAuth2Result, Parameters, ProviderOptions, RefreshOutcome,
    TokenResponse, TokenStore,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProviderSession {
    adapter: Arc<dyn ProviderAdapter>,
    options: ProviderOptions,
    flow: OAuth2Flow,
}

impl ProviderSession {
    /// Build a session from validated options.
    ///
    /// `options.redirect_uri` is required. When `credentials` carry no scope
    /// the adapter's default scope is requested.
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        mut credentials: ApplicationCredentials,
        options: ProviderOptions,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> OAuth2Result<Self> {
        let redirect_uri = options
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| {
                OAuth2Error::InvalidConfig(format!(
                    "{}: redirect_uri is required",
                    adapter.provider_id()
                ))
            })?;

        if credentials.scope.trim().is_empty() {
            credentials.scope = adapter.default_scope().to_string();
        }

        let endpoints = adapter.configure_endpoints(redirect_uri);
        let flow = OAuth2Flow::new(
            adapter.provider_id(),
            credentials,
            endpoints,
            transport,
            store,
        );

        Ok(Self {
            adapter,
            options,
            flow,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.flow = self.flow.with_clock(clock);
        self
    }

    pub fn provider_id(&self) -> &str {
        self.adapter.provider_id()
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub fn flow(&self) -> &OAuth2Flow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut OAuth2Flow {
        &mut self.flow
    }

    pub async fn initialize(&mut self) -> OAuth2Result<FlowState> {
        self.flow.initialize().await
    }

    pub fn is_authorized(&self) -> bool {
        self.flow.is_authorized()
    }

    pub fn state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn login_begin(&self) -> OAuth2Result<String> {
        self.flow
            .login_begin(&self.adapter.login_parameters(&self.options))
    }

    pub async fn login_finish(&mut self, callback: &CallbackParams) -> OAuth2Result<TokenResponse> {
        self.flow
            .login_finish(callback, &Parameters::new(), HttpMethod::Post)
            .await
    }

    pub async fn get_user_profile(&mut self) -> OAuth2Result<UserProfile> {
        self.refresh_if_required().await?;

        let raw = self
            .fetch(&self.adapter.profile_uri(), &Parameters::new())
            .await?;
        let profile = self.adapter.map_profile(&raw)?;

        info!(provider_id = %self.provider_id(), "Fetched user profile");
        Ok(profile)
    }

    pub async fn get_user_contacts(&mut self) -> OAuth2Result<Vec<UserContact>> {
        self.refresh_if_required().await?;

        let (uri, parameters) = self.adapter.contacts_request(&self.options);
        let raw = self.fetch(&uri, &parameters).await?;
        let contacts = self.adapter.map_contacts(&raw)?;

        info!(
            provider_id = %self.provider_id(),
            count = contacts.len(),
            "Fetched user contacts"
        );
        Ok(contacts)
    }

    pub async fn logout(&mut self) -> OAuth2Result<()> {
        self.flow.logout().await
    }

    async fn refresh_if_required(&mut self) -> OAuth2Result<()> {
        if !self.adapter.refresh_before_request() {
            return Ok(());
        }

        let outcome = self
            .flow
            .refresh_access_token(&Parameters::new(), HttpMethod::Post, false)
            .await?;
        if let RefreshOutcome::Skipped(reason) = outcome {
            debug!(provider_id = %self.provider_id(), ?reason, "Token still usable");
        }
        Ok(())
    }

    /// Signed GET decoded as JSON; an empty body decodes to `Value::Null`.
    async fn fetch(&self, uri: &str, parameters: &Parameters) -> OAuth2Result<Value> {
        let body = self
            .flow
            .signed_request(uri, HttpMethod::Get, parameters)
            .await?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            OAuth2Error::profile_request_failed(
                self.provider_id(),
                format!("provider returned a non-JSON response: {e}"),
            )
        })
    }
}
