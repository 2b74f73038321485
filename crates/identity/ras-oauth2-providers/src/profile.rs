//! Normalized user records returned by every provider.

use serde::{Deserialize, Serialize};

/// A signed-in user's profile, as far as the provider discloses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub provider_id: String,
    pub identifier: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub language: Option<String>,
    pub email: Option<String>,
    /// Set to `email` only when the provider vouches for it.
    pub email_verified: Option<String>,
    pub profile_url: Option<String>,
    pub website_url: Option<String>,
    pub photo_url: Option<String>,
    pub region: Option<String>,
    pub birth_day: Option<u32>,
    pub birth_month: Option<u32>,
    pub birth_year: Option<u32>,
}

impl UserProfile {
    pub fn new(provider_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub(crate) fn set_birthday(&mut self, birthday: Birthday) {
        self.birth_day = birthday.day;
        self.birth_month = birthday.month;
        self.birth_year = birthday.year;
    }
}

/// One entry of the user's address book or friend list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub provider_id: String,
    pub identifier: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Birthday {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<u32>,
}

impl Birthday {
    /// `YYYY-MM-DD`
    pub fn parse_iso(value: &str) -> Self {
        let mut parts = value.split('-').map(parse_component);
        let year = parts.next().flatten();
        let month = parts.next().flatten();
        let day = parts.next().flatten();
        Self { day, month, year }
    }

    /// `MM/DD/YYYY`; the year may be withheld.
    pub fn parse_us(value: &str) -> Self {
        let mut parts = value.split('/').map(parse_component);
        let month = parts.next().flatten();
        let day = parts.next().flatten();
        let year = parts.next().flatten();
        Self { day, month, year }
    }
}

fn parse_component(part: &str) -> Option<u32> {
    part.trim().parse().ok().filter(|n| *n > 0)
}

/// Drops empty strings so "absent" has a single representation.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birthday_formats() {
        assert_eq!(
            Birthday::parse_iso("1985-07-04"),
            Birthday {
                day: Some(4),
                month: Some(7),
                year: Some(1985)
            }
        );
        assert_eq!(
            Birthday::parse_us("07/04/1985"),
            Birthday {
                day: Some(4),
                month: Some(7),
                year: Some(1985)
            }
        );
    }

    #[test]
    fn test_partial_birthdays() {
        let birthday = Birthday::parse_us("12/25");
        assert_eq!(birthday.month, Some(12));
        assert_eq!(birthday.day, Some(25));
        assert_eq!(birthday.year, None);

        // Google reports a hidden year as 0000
        let birthday = Birthday::parse_iso("0000-03-15");
        assert_eq!(birthday.year, None);
        assert_eq!(birthday.month, Some(3));

        assert_eq!(Birthday::parse_iso("garbage"), Birthday::default());
    }
}
