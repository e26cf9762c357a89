//! Domain models for the storefront.
//!
//! These are the shapes handlers and services work with. Database row types
//! live next to their queries in [`crate::db`] and convert into these.

pub mod cms;
pub mod collection;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cms::{Banner, BannerInput, HeroInput, HeroSection, SiteSettings, SiteSettingsInput};
pub use collection::{Collection, CollectionInput};
pub use order::{NewOrder, Order, OrderQuery};
pub use product::{Product, ProductInput, ProductPatch, ProductQuery, ProductSort};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{ProfileUpdate, User};

use serde::Serialize;

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Default page size for admin order listings.
pub const ADMIN_PAGE_SIZE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from a slice of results and the unpaged count.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Normalize a requested page and page size.
#[must_use]
pub fn paging(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2], 25, 1, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(Page::<u8>::new(vec![], 0, 1, 12).total_pages, 0);
    }

    #[test]
    fn test_paging_defaults_and_clamps() {
        assert_eq!(paging(None, None, DEFAULT_PAGE_SIZE), (1, 12));
        assert_eq!(paging(Some(0), Some(1000), ADMIN_PAGE_SIZE), (1, MAX_PAGE_SIZE));
        assert_eq!(paging(Some(4), Some(0), ADMIN_PAGE_SIZE), (4, 1));
    }
}
