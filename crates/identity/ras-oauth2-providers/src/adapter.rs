//! Capability interface implemented once per identity provider.

use crate::profile::{UserContact, UserProfile};
use ras_oauth2_client::{EndpointConfig, OAuth2Result, Parameters, ProviderOptions};
use serde_json::Value;

/// Everything that differs between providers.
///
/// Adapters never touch tokens: [`ProviderSession`](crate::ProviderSession)
/// runs the OAuth2 flow and hands the decoded API responses to
/// [`map_profile`](Self::map_profile) and [`map_contacts`](Self::map_contacts).
pub trait ProviderAdapter: Send + Sync {
    /// Also the token storage namespace, so it must be unique per provider.
    fn provider_id(&self) -> &str;

    /// Scope requested when the application configures none.
    fn default_scope(&self) -> &str;

    fn configure_endpoints(&self, redirect_uri: &str) -> EndpointConfig;

    /// Extra authorize URL parameters for this login.
    fn login_parameters(&self, options: &ProviderOptions) -> Parameters {
        options.login_parameters()
    }

    /// Whether the access token should be refreshed (when expired) before
    /// each resource request.
    fn refresh_before_request(&self) -> bool {
        false
    }

    /// URI of the profile resource, absolute or relative to the API base.
    fn profile_uri(&self) -> String;

    /// URI and query of the contacts resource.
    fn contacts_request(&self, options: &ProviderOptions) -> (String, Parameters);

    fn map_profile(&self, raw: &Value) -> OAuth2Result<UserProfile>;

    /// `raw` is `Value::Null` when the provider answered with an empty body.
    fn map_contacts(&self, raw: &Value) -> OAuth2Result<Vec<UserContact>>;
}
