//! Facebook Graph API: `/me` profile and `/me/friends` contacts.

use crate::adapter::ProviderAdapter;
use crate::profile::{Birthday, UserContact, UserProfile, non_empty};
use ras_oauth2_client::{EndpointConfig, OAuth2Error, OAuth2Result, Parameters, ProviderOptions};
use serde::Deserialize;
use serde_json::Value;

pub const FACEBOOK_PROVIDER_ID: &str = "facebook";

const DEFAULT_SCOPE: &str = "email,user_about_me,user_birthday,user_hometown,user_website,read_stream,offline_access,publish_stream,read_friendlists";
const GRAPH_URI: &str = "https://graph.facebook.com";
const PROFILE_PAGE_URI: &str = "https://www.facebook.com/profile.php";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacebookAdapter {
    authorize_uri: String,
    request_token_uri: String,
    api_base_uri: String,
}

impl Default for FacebookAdapter {
    fn default() -> Self {
        Self {
            authorize_uri: "https://www.facebook.com/dialog/oauth".to_string(),
            request_token_uri: format!("{GRAPH_URI}/oauth/access_token"),
            api_base_uri: format!("{GRAPH_URI}/"),
        }
    }
}

impl FacebookAdapter {
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
}

fn picture_url(id: &str) -> String {
    format!("{GRAPH_URI}/{id}/picture?width=150&height=150")
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    link: Option<String>,
    website: Option<String>,
    gender: Option<String>,
    bio: Option<String>,
    email: Option<String>,
    birthday: Option<String>,
    hometown: Option<NamedObject>,
    #[serde(default)]
    verified: bool,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FriendList {
    #[serde(default)]
    data: Vec<Friend>,
}

#[derive(Debug, Deserialize)]
struct Friend {
    id: Option<String>,
    name: Option<String>,
}

impl ProviderAdapter for FacebookAdapter {
    fn provider_id(&self) -> &str {
        FACEBOOK_PROVIDER_ID
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
        .with_authorize_parameter("display", "page")
    }

    fn profile_uri(&self) -> String {
        "me".to_string()
    }

    fn contacts_request(&self, _options: &ProviderOptions) -> (String, Parameters) {
        ("me/friends".to_string(), Parameters::new())
    }

    fn map_profile(&self, raw: &Value) -> OAuth2Result<UserProfile> {
        let user: FacebookUser = serde_json::from_value(raw.clone()).map_err(|e| {
            OAuth2Error::profile_request_failed(FACEBOOK_PROVIDER_ID, e.to_string())
        })?;

        let identifier = match (user.id, user.error) {
            (Some(id), None) if !id.is_empty() => id,
            _ => {
                return Err(OAuth2Error::profile_request_failed(
                    FACEBOOK_PROVIDER_ID,
                    "provider returned an invalid response",
                ));
            }
        };

        let mut profile = UserProfile::new(FACEBOOK_PROVIDER_ID, identifier.as_str());
        profile.display_name = non_empty(user.name);
        profile.first_name = non_empty(user.first_name);
        profile.last_name = non_empty(user.last_name);
        profile.profile_url = non_empty(user.link);
        profile.website_url = non_empty(user.website);
        profile.gender = non_empty(user.gender);
        profile.description = non_empty(user.bio);
        profile.email = non_empty(user.email);
        profile.region = non_empty(user.hometown.and_then(|hometown| hometown.name));
        profile.photo_url = Some(picture_url(&identifier));

        if let Some(birthday) = user.birthday.as_deref() {
            profile.set_birthday(Birthday::parse_us(birthday));
        }
        if user.verified {
            profile.email_verified = profile.email.clone();
        }

        Ok(profile)
    }

    fn map_contacts(&self, raw: &Value) -> OAuth2Result<Vec<UserContact>> {
        if raw.is_null() {
            return Err(OAuth2Error::profile_request_failed(
                FACEBOOK_PROVIDER_ID,
                "contacts request returned an empty response",
            ));
        }

        let friends: FriendList = serde_json::from_value(raw.clone()).map_err(|e| {
            OAuth2Error::profile_request_failed(FACEBOOK_PROVIDER_ID, e.to_string())
        })?;

        let contacts = friends
            .data
            .into_iter()
            .map(|friend| {
                let identifier = friend.id.unwrap_or_default();
                UserContact {
                    provider_id: FACEBOOK_PROVIDER_ID.to_string(),
                    profile_url: Some(format!("{PROFILE_PAGE_URI}?id={identifier}")),
                    photo_url: Some(picture_url(&identifier)),
                    display_name: non_empty(friend.name),
                    identifier,
                    email: None,
                }
            })
            .collect();

        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoints_request_page_display() {
        let endpoints =
            FacebookAdapter::new().configure_endpoints("http://localhost:3000/callback");

        assert_eq!(endpoints.authorize_uri, "https://www.facebook.com/dialog/oauth");
        assert_eq!(
            endpoints.request_token_uri,
            "https://graph.facebook.com/oauth/access_token"
        );
        assert_eq!(endpoints.authorize_uri_parameters["display"], "page");
        assert_eq!(endpoints.resolve("me"), "https://graph.facebook.com/me");
        assert_eq!(endpoints.token_info_uri, None);
    }

    #[test]
    fn test_map_profile() {
        let raw = json!({
            "id": "4",
            "name": "Mark Example",
            "first_name": "Mark",
            "last_name": "Example",
            "link": "https://www.facebook.com/mark",
            "website": "https://mark.example",
            "gender": "male",
            "bio": "Hello",
            "email": "mark@example.com",
            "verified": true,
            "birthday": "05/14/1984",
            "hometown": { "id": "108", "name": "Dobbs Ferry, New York" }
        });

        let profile = FacebookAdapter::new().map_profile(&raw).unwrap();

        assert_eq!(profile.provider_id, "facebook");
        assert_eq!(profile.identifier, "4");
        assert_eq!(profile.description.as_deref(), Some("Hello"));
        assert_eq!(profile.website_url.as_deref(), Some("https://mark.example"));
        assert_eq!(profile.region.as_deref(), Some("Dobbs Ferry, New York"));
        assert_eq!(
            profile.photo_url.as_deref(),
            Some("https://graph.facebook.com/4/picture?width=150&height=150")
        );
        assert_eq!(profile.email_verified.as_deref(), Some("mark@example.com"));
        assert_eq!(
            (profile.birth_day, profile.birth_month, profile.birth_year),
            (Some(14), Some(5), Some(1984))
        );
    }

    #[test]
    fn test_map_profile_without_id_fails() {
        let raw = json!({
            "error": { "message": "Error validating access token", "type": "OAuthException" }
        });

        let err = FacebookAdapter::new().map_profile(&raw).unwrap_err();
        assert!(matches!(err, OAuth2Error::ProfileRequestFailed { .. }));
    }

    #[test]
    fn test_map_contacts() {
        let raw = json!({
            "data": [
                { "id": "11", "name": "Alice" },
                { "id": "12", "name": "Bob" }
            ]
        });

        let contacts = FacebookAdapter::new().map_contacts(&raw).unwrap();

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].identifier, "11");
        assert_eq!(contacts[0].display_name.as_deref(), Some("Alice"));
        assert_eq!(
            contacts[0].profile_url.as_deref(),
            Some("https://www.facebook.com/profile.php?id=11")
        );
        assert_eq!(
            contacts[1].photo_url.as_deref(),
            Some("https://graph.facebook.com/12/picture?width=150&height=150")
        );
    }

    #[test]
    fn test_contacts_without_data_are_empty() {
        let adapter = FacebookAdapter::new();
        assert!(adapter.map_contacts(&json!({ "data": [] })).unwrap().is_empty());
        assert!(adapter.map_contacts(&json!({})).unwrap().is_empty());
        assert!(adapter.map_contacts(&Value::Null).is_err());
    }
}
