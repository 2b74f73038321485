//! Access/refresh token pair and token endpoint responses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Tokens held for one provider session.
///
/// `access_token_expires_at` is always computed locally from
/// `access_token_expires_in` and is present exactly when the latter is.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds declared by the provider at issuance.
    #[serde(default)]
    pub access_token_expires_in: Option<i64>,
    #[serde(default)]
    pub access_token_expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token_expires_in", &self.access_token_expires_in)
            .field("access_token_expires_at", &self.access_token_expires_at)
            .finish()
    }
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// True once `now` has reached the computed expiry. Tokens without a
    /// known expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expires_at
            .is_some_and(|expires_at| now >= expires_at)
    }

    /// Apply an authorization-code grant response. Fields the provider left
    /// out keep their current value.
    pub(crate) fn apply_grant(&mut self, response: &TokenResponse, now: DateTime<Utc>) {
        if let Some(access_token) = response.access_token() {
            self.access_token = Some(access_token.to_string());
        }
        if let Some(refresh_token) = response.refresh_token() {
            self.refresh_token = Some(refresh_token.to_string());
        }
        if let Some(expires_in) = response.expires_in() {
            self.set_expiry(expires_in, now);
        }
    }

    /// Apply a refresh grant response. The access token is replaced; a
    /// missing refresh token means "unchanged"; a missing or zero lifetime
    /// leaves the previous expiry in place.
    pub(crate) fn apply_refresh(&mut self, response: &TokenResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token().map(str::to_string);
        if let Some(refresh_token) = response.refresh_token() {
            self.refresh_token = Some(refresh_token.to_string());
        }
        if let Some(expires_in) = response.expires_in().filter(|e| *e != 0) {
            self.set_expiry(expires_in, now);
        }
    }

    fn set_expiry(&mut self, expires_in: i64, now: DateTime<Utc>) {
        let Some(expires_at) =
            Duration::try_seconds(expires_in).and_then(|lifetime| now.checked_add_signed(lifetime))
        else {
            warn!(expires_in, "Ignoring out-of-range token lifetime");
            return;
        };

        self.access_token_expires_in = Some(expires_in);
        self.access_token_expires_at = Some(expires_at);
    }
}

/// Parsed body of a token endpoint response.
///
/// Providers answer with JSON; a few legacy endpoints answer with a
/// form-encoded body instead, which is accepted as a fallback. The raw
/// document is kept for provider-specific extras such as ID tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse {
    raw: Value,
}

impl TokenResponse {
    pub fn parse(body: &str) -> Self {
        let raw = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) => Value::Object(Map::new()),
            Err(_) => {
                let map = url::form_urlencoded::parse(body.trim().as_bytes())
                    .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
                    .collect::<Map<_, _>>();
                Value::Object(map)
            }
        };

        Self { raw }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.string_field("access_token")
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.string_field("refresh_token")
    }

    /// Token lifetime in seconds; `expires` is accepted as a legacy alias.
    pub fn expires_in(&self) -> Option<i64> {
        self.integer_field("expires_in")
            .or_else(|| self.integer_field("expires"))
    }

    /// Provider error code, e.g. `invalid_grant`.
    pub fn error(&self) -> Option<&str> {
        self.string_field("error")
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    fn string_field(&self, name: &str) -> Option<&str> {
        self.raw
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    fn integer_field(&self, name: &str) -> Option<i64> {
        match self.raw.get(name)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Value::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_parse_json_response() {
        let response = TokenResponse::parse(
            r#"{"access_token":"AT1","refresh_token":"RT1","expires_in":3600,"id_token":"abc"}"#,
        );

        assert_eq!(response.access_token(), Some("AT1"));
        assert_eq!(response.refresh_token(), Some("RT1"));
        assert_eq!(response.expires_in(), Some(3600));
        assert_eq!(response.raw()["id_token"], "abc");
    }

    #[test]
    fn test_parse_form_encoded_response() {
        let response = TokenResponse::parse("access_token=AT%2B1&expires=5183999");

        assert_eq!(response.access_token(), Some("AT+1"));
        assert_eq!(response.refresh_token(), None);
        assert_eq!(response.expires_in(), Some(5183999));
    }

    #[test]
    fn test_parse_string_lifetime_and_garbage() {
        let response = TokenResponse::parse(r#"{"access_token":"AT","expires_in":"120"}"#);
        assert_eq!(response.expires_in(), Some(120));

        let response = TokenResponse::parse("not json");
        assert_eq!(response.access_token(), None);

        let response = TokenResponse::parse(r#"["not", "an", "object"]"#);
        assert_eq!(response.access_token(), None);
    }

    #[test]
    fn test_grant_computes_expiry_locally() {
        let mut tokens = TokenSet::new();
        let response = TokenResponse::parse(
            r#"{"access_token":"AT1","refresh_token":"RT1","expires_in":3600,"expires_at":1}"#,
        );

        tokens.apply_grant(&response, at(1000));

        assert_eq!(tokens.access_token.as_deref(), Some("AT1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(tokens.access_token_expires_in, Some(3600));
        assert_eq!(tokens.access_token_expires_at, Some(at(4600)));
    }

    #[test]
    fn test_grant_does_not_clobber_absent_fields() {
        let mut tokens = TokenSet {
            access_token: Some("AT0".to_string()),
            refresh_token: Some("RT0".to_string()),
            access_token_expires_in: Some(60),
            access_token_expires_at: Some(at(60)),
        };

        tokens.apply_grant(&TokenResponse::parse(r#"{"access_token":"AT1"}"#), at(1000));

        assert_eq!(tokens.access_token.as_deref(), Some("AT1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("RT0"));
        assert_eq!(tokens.access_token_expires_at, Some(at(60)));
    }

    #[test]
    fn test_refresh_ignores_zero_lifetime() {
        let mut tokens = TokenSet {
            access_token: Some("AT1".to_string()),
            refresh_token: Some("RT1".to_string()),
            access_token_expires_in: Some(3600),
            access_token_expires_at: Some(at(4600)),
        };

        tokens.apply_refresh(
            &TokenResponse::parse(r#"{"access_token":"AT2","expires_in":0}"#),
            at(5000),
        );

        assert_eq!(tokens.access_token.as_deref(), Some("AT2"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(tokens.access_token_expires_in, Some(3600));
        assert_eq!(tokens.access_token_expires_at, Some(at(4600)));
    }

    #[test]
    fn test_expiry_check() {
        let tokens = TokenSet {
            access_token: Some("AT1".to_string()),
            access_token_expires_in: Some(3600),
            access_token_expires_at: Some(at(4600)),
            ..TokenSet::default()
        };

        assert!(!tokens.is_expired_at(at(2000)));
        assert!(tokens.is_expired_at(at(4600)));
        assert!(tokens.is_expired_at(at(5000)));
        assert!(!TokenSet::new().is_expired_at(at(5000)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let tokens = TokenSet {
            access_token: Some("super-secret".to_string()),
            ..TokenSet::default()
        };

        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
