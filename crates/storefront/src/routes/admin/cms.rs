//! Homepage content management: hero, banners, and site settings.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use shopfront_core::BannerId;

use crate::db::CmsRepository;
use crate::error::{AppError, AppJson, Result, not_found};
use crate::middleware::RequireAdmin;
use crate::models::{Banner, BannerInput, HeroInput, HeroSection, SiteSettings, SiteSettingsInput};
use crate::routes::auth::SuccessResponse;
use crate::state::AppState;

/// Build the CMS admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/cms/hero", get(hero).put(update_hero))
        .route("/admin/cms/banners", get(banners).post(create_banner))
        .route(
            "/admin/cms/banners/{id}",
            put(update_banner).delete(delete_banner),
        )
        .route("/admin/settings", get(settings).put(update_settings))
}

/// The active hero section.
///
/// # Errors
///
/// Returns 404 if no hero has been written yet.
pub async fn hero(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<HeroSection>> {
    let hero = CmsRepository::new(state.pool())
        .active_hero()
        .await?
        .ok_or(AppError::NotFound("Hero section"))?;
    Ok(Json(hero))
}

/// Write the hero section and make it the active one.
///
/// # Errors
///
/// Returns 400 for invalid fields.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn update_hero(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<HeroInput>,
) -> Result<Json<HeroSection>> {
    input.validate()?;
    let hero = CmsRepository::new(state.pool()).upsert_hero(&input).await?;
    Ok(Json(hero))
}

/// Every banner, active or not, in display order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn banners(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Banner>>> {
    let banners = CmsRepository::new(state.pool()).banners(false).await?;
    Ok(Json(banners))
}

/// Add a banner. Without an `order` it goes last.
///
/// # Errors
///
/// Returns 400 for invalid fields.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn create_banner(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    input.validate()?;
    let banner = CmsRepository::new(state.pool()).create_banner(&input).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

/// Replace a banner.
///
/// # Errors
///
/// Returns 404 if the banner doesn't exist and 400 for invalid fields.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn update_banner(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    AppJson(input): AppJson<BannerInput>,
) -> Result<Json<Banner>> {
    input.validate()?;
    let banner = CmsRepository::new(state.pool())
        .update_banner(id, &input)
        .await
        .map_err(not_found("Banner"))?;
    Ok(Json(banner))
}

/// Delete a banner.
///
/// # Errors
///
/// Returns 404 if the banner doesn't exist.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn delete_banner(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<Json<SuccessResponse>> {
    if !CmsRepository::new(state.pool()).delete_banner(id).await? {
        return Err(AppError::NotFound("Banner"));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// Site settings. The default row is created on first read.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn settings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SiteSettings>> {
    let settings = CmsRepository::new(state.pool()).settings().await?;
    Ok(Json(settings))
}

/// Replace the site settings.
///
/// # Errors
///
/// Returns 400 for invalid fields.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn update_settings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<SiteSettingsInput>,
) -> Result<Json<SiteSettings>> {
    input.validate()?;
    let settings = CmsRepository::new(state.pool())
        .update_settings(&input)
        .await?;
    Ok(Json(settings))
}
