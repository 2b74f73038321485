//! Google accounts: userinfo v1 profile and the contacts data feed.

use crate::adapter::ProviderAdapter;
use crate::profile::{Birthday, UserContact, UserProfile, non_empty};
use ras_oauth2_client::{EndpointConfig, OAuth2Error, OAuth2Result, Parameters, ProviderOptions};
use serde::Deserialize;
use serde_json::Value;

pub const GOOGLE_PROVIDER_ID: &str = "google";

const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.profile https://www.googleapis.com/auth/userinfo.email https://www.google.com/m8/feeds/";
const DEFAULT_CONTACTS_MAX_RESULTS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleAdapter {
    authorize_uri: String,
    request_token_uri: String,
    token_info_uri: String,
    api_base_uri: String,
    contacts_uri: String,
}

impl Default for GoogleAdapter {
    fn default() -> Self {
        Self {
            authorize_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            request_token_uri: "https://accounts.google.com/o/oauth2/token".to_string(),
            token_info_uri: "https://www.googleapis.com/oauth2/v1/tokeninfo".to_string(),
            api_base_uri: "https://www.googleapis.com/".to_string(),
            contacts_uri: "https://www.google.com/m8/feeds/contacts/default/full".to_string(),
        }
    }
}

impl GoogleAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorize_uri(mut self, uri: impl Into<String>) -> Self {
        self.authorize_uri = uri.into();
        self
    }

    pub fn with_request_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_token_uri = uri.into();
        self
    }

    pub fn with_api_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.api_base_uri = uri.into();
        self
    }

    pub fn with_contacts_uri(mut self, uri: impl Into<String>) -> Self {
        self.contacts_uri = uri.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
    link: Option<String>,
    gender: Option<String>,
    email: Option<String>,
    locale: Option<String>,
    birthday: Option<String>,
    #[serde(default)]
    verified_email: bool,
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactsFeed {
    #[serde(default)]
    feed: Option<Feed>,
}

#[derive(Debug, Default, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<ContactEntry>,
}

#[derive(Debug, Deserialize)]
struct ContactEntry {
    #[serde(rename = "gd$email", default)]
    emails: Vec<EmailAddress>,
    title: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$t")]
    text: Option<String>,
}

impl ProviderAdapter for GoogleAdapter {
    fn provider_id(&self) -> &str {
        GOOGLE_PROVIDER_ID
    }

    fn default_scope(&self) -> &str {
        DEFAULT_SCOPE
    }

    fn configure_endpoints(&self, redirect_uri: &str) -> EndpointConfig {
        EndpointConfig::new(
            self.authorize_uri.as_str(),
            self.request_token_uri.as_str(),
            self.api_base_uri.as_str(),
            redirect_uri,
        )
        .with_token_info_uri(self.token_info_uri.as_str())
    }

    fn login_parameters(&self, options: &ProviderOptions) -> Parameters {
        // Offline access unless the caller says otherwise
        let mut parameters =
            Parameters::from([("access_type".to_string(), "offline".to_string())]);
        parameters.extend(options.login_parameters());
        parameters
    }

    fn refresh_before_request(&self) -> bool {
        true
    }

    fn profile_uri(&self) -> String {
        "oauth2/v1/userinfo".to_string()
    }

    fn contacts_request(&self, options: &ProviderOptions) -> (String, Parameters) {
        let max_results = options
            .contacts_max_results
            .unwrap_or(DEFAULT_CONTACTS_MAX_RESULTS);

        (
            self.contacts_uri.clone(),
            Parameters::from([
                ("alt".to_string(), "json".to_string()),
                ("max-results".to_string(), max_results.to_string()),
            ]),
        )
    }

    fn map_profile(&self, raw: &Value) -> OAuth2Result<UserProfile> {
        let info: GoogleUserInfo = serde_json::from_value(raw.clone()).map_err(|e| {
            OAuth2Error::profile_request_failed(GOOGLE_PROVIDER_ID, e.to_string())
        })?;

        let identifier = match (info.id, info.error) {
            (Some(id), None) if !id.is_empty() => id,
            _ => {
                return Err(OAuth2Error::profile_request_failed(
                    GOOGLE_PROVIDER_ID,
                    "provider returned an invalid response",
                ));
            }
        };

        let mut profile = UserProfile::new(GOOGLE_PROVIDER_ID, identifier);
        profile.display_name = non_empty(info.name);
        profile.first_name = non_empty(info.given_name);
        profile.last_name = non_empty(info.family_name);
        profile.photo_url = non_empty(info.picture);
        profile.profile_url = non_empty(info.link);
        profile.gender = non_empty(info.gender);
        profile.email = non_empty(info.email);
        profile.language = non_empty(info.locale);

        if let Some(birthday) = info.birthday.as_deref() {
            profile.set_birthday(Birthday::parse_iso(birthday));
        }
        if info.verified_email {
            profile.email_verified = profile.email.clone();
        }

        Ok(profile)
    }

    fn map_contacts(&self, raw: &Value) -> OAuth2Result<Vec<UserContact>> {
        if raw.is_null() {
            return Ok(Vec::new());
        }

        let feed: ContactsFeed = serde_json::from_value(raw.clone()).map_err(|e| {
            OAuth2Error::profile_request_failed(GOOGLE_PROVIDER_ID, e.to_string())
        })?;

        let contacts = feed
            .feed
            .unwrap_or_default()
            .entry
            .into_iter()
            .map(|entry| {
                let email = non_empty(
                    entry
                        .emails
                        .into_iter()
                        .next()
                        .and_then(|email| email.address),
                );

                UserContact {
                    provider_id: GOOGLE_PROVIDER_ID.to_string(),
                    identifier: email.clone().unwrap_or_default(),
                    display_name: non_empty(entry.title.and_then(|title| title.text)),
                    email,
                    ..UserContact::default()
                }
            })
            .collect();

        Ok(contacts)
    }
}
