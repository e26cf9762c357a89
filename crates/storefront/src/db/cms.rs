//! Homepage content repository: hero section, banners, and site settings.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shopfront_core::{BannerId, HeroSectionId};

use super::RepositoryError;
use crate::models::cms::DEFAULT_SITE_NAME;
use crate::models::{Banner, BannerInput, HeroInput, HeroSection, SiteSettings, SiteSettingsInput};

#[derive(sqlx::FromRow)]
struct HeroRow {
    id: Uuid,
    title: String,
    subtitle: String,
    image: String,
    cta_text: String,
    cta_link: String,
    active: bool,
    updated_at: DateTime<Utc>,
}

impl From<HeroRow> for HeroSection {
    fn from(row: HeroRow) -> Self {
        Self {
            id: HeroSectionId::from_uuid(row.id),
            title: row.title,
            subtitle: row.subtitle,
            image: row.image,
            cta_text: row.cta_text,
            cta_link: row.cta_link,
            active: row.active,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: Uuid,
    title: String,
    description: String,
    image: String,
    link: String,
    active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
}

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Self {
            id: BannerId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            image: row.image,
            link: row.link,
            active: row.active,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    site_name: String,
    logo: String,
    email: String,
    phone: String,
    address: String,
    facebook: String,
    instagram: String,
    twitter: String,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for SiteSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            site_name: row.site_name,
            logo: row.logo,
            email: row.email,
            phone: row.phone,
            address: row.address,
            facebook: row.facebook,
            instagram: row.instagram,
            twitter: row.twitter,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for homepage content.
pub struct CmsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CmsRepository<'a> {
    /// Create a new CMS repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Hero section
    // =========================================================================

    /// The hero currently shown on the homepage, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_hero(&self) -> Result<Option<HeroSection>, RepositoryError> {
        let row = sqlx::query_as::<_, HeroRow>(
            r"
            SELECT id, title, subtitle, image, cta_text, cta_link, active, updated_at
            FROM shop.hero_section
            WHERE active
            ",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(HeroSection::from))
    }

    /// Write the hero and make it the only active one.
    ///
    /// Reuses the oldest existing row so the table holds a single hero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn upsert_hero(&self, input: &HeroInput) -> Result<HeroSection, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE shop.hero_section SET active = FALSE WHERE active")
            .execute(&mut *tx)
            .await?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM shop.hero_section ORDER BY updated_at LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;
        let id = existing.map_or_else(HeroSectionId::generate, |(id,)| {
            HeroSectionId::from_uuid(id)
        });

        let row = sqlx::query_as::<_, HeroRow>(
            r"
            INSERT INTO shop.hero_section (id, title, subtitle, image, cta_text, cta_link, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, subtitle = EXCLUDED.subtitle, image = EXCLUDED.image,
                cta_text = EXCLUDED.cta_text, cta_link = EXCLUDED.cta_link,
                active = TRUE, updated_at = now()
            RETURNING id, title, subtitle, image, cta_text, cta_link, active, updated_at
            ",
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(input.subtitle.trim())
        .bind(input.image.trim())
        .bind(input.cta_text.trim())
        .bind(input.cta_link.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    // =========================================================================
    // Banners
    // =========================================================================

    /// Banners in display order. `active_only` hides inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn banners(&self, active_only: bool) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(
            r"
            SELECT id, title, description, image, link, active, sort_order, created_at
            FROM shop.banner
            WHERE active OR NOT $1
            ORDER BY sort_order, created_at
            ",
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Banner::from).collect())
    }

    /// Insert a banner. Without an explicit order it goes after the last one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_banner(&self, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(
            r"
            INSERT INTO shop.banner (id, title, description, image, link, active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6,
                    COALESCE($7, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM shop.banner)))
            RETURNING id, title, description, image, link, active, sort_order, created_at
            ",
        )
        .bind(BannerId::generate())
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(input.image.trim())
        .bind(input.link.trim())
        .bind(input.active)
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a banner. Without an explicit order it keeps its position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn update_banner(
        &self,
        id: BannerId,
        input: &BannerInput,
    ) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(
            r"
            UPDATE shop.banner
            SET title = $2, description = $3, image = $4, link = $5, active = $6,
                sort_order = COALESCE($7, sort_order)
            WHERE id = $1
            RETURNING id, title, description, image, link, active, sort_order, created_at
            ",
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(input.image.trim())
        .bind(input.link.trim())
        .bind(input.active)
        .bind(input.sort_order)
        .fetch_optional(self.pool)
        .await?;

        row.map(Banner::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a banner.
    ///
    /// # Returns
    ///
    /// Returns `true` if the banner was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_banner(&self, id: BannerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Site settings
    // =========================================================================

    /// Read the settings, creating the default row on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn settings(&self) -> Result<SiteSettings, RepositoryError> {
        sqlx::query("INSERT INTO shop.site_settings (site_name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(DEFAULT_SITE_NAME)
            .execute(self.pool)
            .await?;

        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            SELECT site_name, logo, email, phone, address, facebook, instagram, twitter, updated_at
            FROM shop.site_settings
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace the settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_settings(
        &self,
        input: &SiteSettingsInput,
    ) -> Result<SiteSettings, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            INSERT INTO shop.site_settings
                (site_name, logo, email, phone, address, facebook, instagram, twitter)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET site_name = EXCLUDED.site_name, logo = EXCLUDED.logo, email = EXCLUDED.email,
                phone = EXCLUDED.phone, address = EXCLUDED.address,
                facebook = EXCLUDED.facebook, instagram = EXCLUDED.instagram,
                twitter = EXCLUDED.twitter, updated_at = now()
            RETURNING site_name, logo, email, phone, address, facebook, instagram, twitter,
                      updated_at
            ",
        )
        .bind(input.site_name.trim())
        .bind(input.logo.trim())
        .bind(input.email.trim().to_lowercase())
        .bind(input.phone.trim())
        .bind(input.address.trim())
        .bind(input.facebook.trim())
        .bind(input.instagram.trim())
        .bind(input.twitter.trim())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
