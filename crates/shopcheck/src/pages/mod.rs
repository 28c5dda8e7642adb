//! Page objects for the catalog walk.
//!
//! Each page object borrows the [`Session`] and exposes one method per
//! user-visible affordance. Methods that change the application state consume
//! the current page object and return the next one, so the pipeline
//!
//! ```text
//! MainPage ──click_catalog──► CatalogPage ──hover_category──► CatalogPage
//!          ──click_subcategory──► ListingPage ──check_section / select_brands
//!          / wait_for_products──► ListingPage ──verify_all_pages_match──► PaginationReport
//! ```
//!
//! can only be written in order. Every method runs as one reported step.

mod catalog;
mod listing;
mod main_page;

pub use catalog::CatalogPage;
pub use listing::{
    AssertionMode, ListingPage, Mismatch, PageSummary, PaginationOptions, PaginationReport,
    DEFAULT_DEADLINE_MS, DEFAULT_MAX_PAGES,
};
pub use main_page::MainPage;

use crate::driver::BrowserDriver;
use crate::locator::{Condition, Locator};
use crate::result::ShopcheckResult;
use crate::session::Session;

/// Common behaviour of page objects
pub trait PageObject {
    /// Page name for step titles and logs
    fn page_name(&self) -> &'static str;
}

/// Wait for `condition` on the first match, then click it
pub(crate) async fn click_when<D: BrowserDriver>(
    session: &mut Session<D>,
    locator: &Locator,
    condition: Condition,
) -> ShopcheckResult<()> {
    let waiter = *session.waiter();
    let handle = waiter.until(session.driver(), locator, condition).await?;
    session.driver_mut().click(&handle).await
}

/// Wait for `condition` on the first match, then hover it
pub(crate) async fn hover_when<D: BrowserDriver>(
    session: &mut Session<D>,
    locator: &Locator,
    condition: Condition,
) -> ShopcheckResult<()> {
    let waiter = *session.waiter();
    let handle = waiter.until(session.driver(), locator, condition).await?;
    session.driver_mut().hover(&handle).await
}
