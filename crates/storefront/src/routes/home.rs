//! Home page route handler.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use crate::db::{CmsRepository, CollectionRepository, ProductRepository};
use crate::error::Result;
use crate::models::{Banner, Collection, HeroSection, Product, SiteSettings};
use crate::state::AppState;

/// Number of featured products shown on the home page.
const FEATURED_PRODUCTS: u32 = 8;

/// Build the home router.
pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

/// Everything the home page shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub hero: Option<HeroSection>,
    pub banners: Vec<Banner>,
    pub featured_products: Vec<Product>,
    pub featured_collections: Vec<Collection>,
    pub settings: SiteSettings,
}

/// Home page content.
///
/// # Errors
///
/// Returns an error if any of the content queries fail.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomePage>> {
    let cms = CmsRepository::new(state.pool());
    let products = ProductRepository::new(state.pool());
    let collections = CollectionRepository::new(state.pool());

    let (hero, banners, featured_products, featured_collections, settings) = tokio::try_join!(
        cms.active_hero(),
        cms.banners(true),
        products.featured(FEATURED_PRODUCTS),
        collections.list(Some(true)),
        cms.settings(),
    )?;

    Ok(Json(HomePage {
        hero,
        banners,
        featured_products,
        featured_collections,
        settings,
    }))
}
