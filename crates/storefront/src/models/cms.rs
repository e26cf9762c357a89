//! Homepage content: hero section, banners, and site settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{BannerId, HeroSectionId, ValidationErrors};

/// Default store name used when settings are first read.
pub const DEFAULT_SITE_NAME: &str = "Fashion Store";

/// The large banner at the top of the homepage. At most one is active.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub id: HeroSectionId,
    pub title: String,
    pub subtitle: String,
    pub image: String,
    pub cta_text: String,
    pub cta_link: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Hero edit form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cta_text: String,
    #[serde(default)]
    pub cta_link: String,
}

impl HeroInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns field errors for a blank title.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.title, "title", "Title is required");
        errors.finish()
    }
}

/// A promotional banner. Displayed in ascending `order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub active: bool,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Banner create/update form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Explicit position; new banners go to the end when omitted.
    #[serde(default, rename = "order")]
    pub sort_order: Option<i32>,
}

const fn default_true() -> bool {
    true
}

impl BannerInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns field errors for a blank title or image.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.title, "title", "Title is required");
        errors.require(&self.image, "image", "Image is required");
        errors.check(
            self.sort_order.is_some_and(|o| o < 0),
            "order",
            "Order must not be negative",
        );
        errors.finish()
    }
}

/// Store-wide settings (a singleton row).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub logo: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub facebook: String,
    pub instagram: String,
    pub twitter: String,
    pub updated_at: DateTime<Utc>,
}

/// Settings edit form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettingsInput {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub twitter: String,
}

impl SiteSettingsInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns field errors for a blank site name or a malformed contact email.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.site_name, "siteName", "Site name is required");
        errors.check(
            !self.email.trim().is_empty() && shopfront_core::Email::parse(&self.email).is_err(),
            "email",
            "Invalid email",
        );
        errors.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hero_requires_title() {
        let hero = HeroInput {
            title: " ".into(),
            subtitle: String::new(),
            image: String::new(),
            cta_text: String::new(),
            cta_link: String::new(),
        };
        assert_eq!(hero.validate().unwrap_err().first_message(), "Title is required");
    }

    #[test]
    fn test_banner_defaults() {
        let banner: BannerInput =
            serde_json::from_value(serde_json::json!({"title": "Sale", "image": "/s.jpg"}))
                .unwrap();
        assert!(banner.active);
        assert_eq!(banner.sort_order, None);
        assert!(banner.validate().is_ok());
    }

    #[test]
    fn test_settings_email_optional_but_checked() {
        let mut input: SiteSettingsInput =
            serde_json::from_value(serde_json::json!({"siteName": "Shop"})).unwrap();
        assert!(input.validate().is_ok());
        input.email = "not-mail".into();
        assert!(input.validate().is_err());
    }
}
