//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId, UserRole, ValidationErrors};

use super::CurrentUser;

/// A storefront account (domain type). Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The identity stored in the session after login.
    #[must_use]
    pub fn to_current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Profile edit form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A profile edit that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProfile {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns field errors for a blank name or an invalid email.
    pub fn validate(self) -> Result<ValidProfile, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length(&self.name, "name", 1, 100, "Name is required");
        let email = Email::parse(&self.email);
        errors.check(email.is_err(), "email", "Invalid email");
        errors.finish()?;

        let email = email.map_err(|_| ValidationErrors::single("email", "Invalid email"))?;
        Ok(ValidProfile {
            name: self.name.trim().to_owned(),
            email,
            phone: self
                .phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_validates() {
        let ok = ProfileUpdate {
            name: " Grace ".into(),
            email: "GRACE@navy.mil".into(),
            phone: Some("  ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name, "Grace");
        assert_eq!(ok.email.as_str(), "grace@navy.mil");
        assert_eq!(ok.phone, None);

        let err = ProfileUpdate {
            name: String::new(),
            email: "nope".into(),
            phone: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }
}
