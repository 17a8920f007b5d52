//! User account domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadget_pulse_core::{Email, Uid};

/// A user account (domain type).
///
/// Created on registration with a verified credential or by a promotion path.
/// Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: Uid,
    pub email: Email,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub bio: String,
    pub phone_number: String,
    /// Mirrors "an admin record exists for this uid".
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub uid: Uid,
    pub email: Email,
    pub display_name: String,
    pub photo_url: Option<String>,
}

impl Account {
    /// Builds a new, non-admin account with empty profile fields.
    #[must_use]
    pub fn new(seed: AccountSeed, now: DateTime<Utc>) -> Self {
        Self {
            uid: seed.uid,
            email: seed.email,
            display_name: seed.display_name,
            photo_url: seed.photo_url.unwrap_or_default(),
            bio: String::new(),
            phone_number: String::new(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields a user (or an admin with `manageUsers`) may change.
///
/// `isAdmin`, `email` and `uid` cannot be changed here. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(
        default,
        rename = "photoURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.phone_number.is_none()
            && self.photo_url.is_none()
    }

    /// Trims the display name and rejects empty updates or a blank name.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn normalized(mut self) -> Result<Self, &'static str> {
        if self.is_empty() {
            return Err("no update data provided");
        }
        if let Some(name) = self.display_name.as_mut() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err("displayName cannot be blank");
            }
            *name = trimmed.to_owned();
        }
        Ok(self)
    }

    /// Applies the set fields to `account`.
    pub fn apply_to(&self, account: &mut Account, now: DateTime<Utc>) {
        if let Some(v) = &self.display_name {
            account.display_name.clone_from(v);
        }
        if let Some(v) = &self.bio {
            account.bio.clone_from(v);
        }
        if let Some(v) = &self.phone_number {
            account.phone_number.clone_from(v);
        }
        if let Some(v) = &self.photo_url {
            account.photo_url.clone_from(v);
        }
        account.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(
            AccountSeed {
                uid: Uid::parse("u1").unwrap(),
                email: Email::parse("a@x.com").unwrap(),
                display_name: "Alice".to_owned(),
                photo_url: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_account_is_not_admin() {
        let account = account();
        assert!(!account.is_admin);
        assert_eq!(account.bio, "");
        assert_eq!(account.photo_url, "");
    }

    #[test]
    fn test_serializes_photo_url_key() {
        let json = serde_json::to_value(account()).unwrap();
        assert_eq!(json["photoURL"], "");
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["displayName"], "Alice");
    }

    #[test]
    fn test_update_rejects_is_admin() {
        let result = serde_json::from_str::<ProfileUpdate>(r#"{"isAdmin": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_rejects_empty_and_blank() {
        assert_eq!(
            ProfileUpdate::default().normalized(),
            Err("no update data provided")
        );
        let blank = ProfileUpdate {
            display_name: Some("   ".to_owned()),
            ..ProfileUpdate::default()
        };
        assert!(blank.normalized().is_err());
    }

    #[test]
    fn test_apply_only_touches_set_fields() {
        let mut account = account();
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"bio": "hi", "photoURL": "https://img/x.png"}"#).unwrap();
        update.normalized().unwrap().apply_to(&mut account, Utc::now());
        assert_eq!(account.bio, "hi");
        assert_eq!(account.photo_url, "https://img/x.png");
        assert_eq!(account.display_name, "Alice");
        assert_eq!(account.phone_number, "");
    }
}
