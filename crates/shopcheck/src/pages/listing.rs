//! Product listing: section check, brand filter and the pagination loop.
//!
//! # Pagination
//!
//! ```text
//!        ┌──────────────────────────────────────────────────────┐
//!        ▼                                                      │
//!  query products ──► check every title ──► next link exists? ──┤ yes: bounds,
//!  (fresh query)      (FailFast: abort,          │              │ click, wait for
//!                      CollectAll: record)       │ no           │ the page to change,
//!                                                ▼              │ wait per slot
//!                                          PaginationReport ────┘
//! ```
//!
//! The loop is bounded by `max_pages` and a cumulative deadline. A next link
//! that does not change the listing when clicked is reported as stuck.

use super::{click_when, PageObject};
use crate::driver::BrowserDriver;
use crate::filter::{BrandFilter, FilterTerm, Subcategory};
use crate::locator::Condition;
use crate::result::{ShopcheckError, ShopcheckResult};
use crate::session::Session;
use crate::wait::{Deadline, DEFAULT_SLOT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Default page cap
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Default cumulative pagination deadline (10 minutes)
pub const DEFAULT_DEADLINE_MS: u64 = 600_000;

// =============================================================================
// OPTIONS
// =============================================================================

/// What a filter mismatch does to the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionMode {
    /// Abort on the first mismatching title
    #[default]
    FailFast,
    /// Traverse every page, then fail with all mismatches
    CollectAll,
}

impl FromStr for AssertionMode {
    type Err = ShopcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" | "failfast" => Ok(Self::FailFast),
            "collect-all" | "collectall" => Ok(Self::CollectAll),
            other => Err(ShopcheckError::config(format!(
                "unknown assertion mode '{other}' (expected fail-fast or collect-all)"
            ))),
        }
    }
}

/// Bounds and policy for the pagination loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationOptions {
    /// Most pages to visit; `None` leaves only the deadline
    pub max_pages: Option<usize>,
    /// Cumulative deadline in milliseconds
    pub deadline_ms: u64,
    /// Existence window per product slot after a page change
    pub slot_timeout_ms: u64,
    /// Mismatch policy
    pub assertion_mode: AssertionMode,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            max_pages: Some(DEFAULT_MAX_PAGES),
            deadline_ms: DEFAULT_DEADLINE_MS,
            slot_timeout_ms: DEFAULT_SLOT_TIMEOUT_MS,
            assertion_mode: AssertionMode::FailFast,
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// One visited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-based page number
    pub page: usize,
    /// URL while the page was checked
    pub url: String,
    /// Products checked on the page
    pub products: usize,
}

/// A title that does not contain the filter term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// 1-based page number
    pub page: usize,
    /// Offending title
    pub title: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}: {}", self.page, self.title)
    }
}

/// Outcome of a full traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationReport {
    /// Pages visited
    pub pages: usize,
    /// Titles checked across all pages
    pub products_checked: usize,
    /// Per-page counts in visit order
    pub per_page: Vec<PageSummary>,
    /// Mismatches recorded in collect-all mode
    pub mismatches: Vec<Mismatch>,
}

impl PaginationReport {
    fn record_page(&mut self, page: usize, url: String, products: usize) {
        self.pages = page;
        self.products_checked += products;
        self.per_page.push(PageSummary { page, url, products });
    }
}

// =============================================================================
// LISTING PAGE
// =============================================================================

/// A subcategory listing
#[derive(Debug)]
pub struct ListingPage<'a, D: BrowserDriver> {
    session: &'a mut Session<D>,
    consent_dismissed: bool,
}

impl<D: BrowserDriver> PageObject for ListingPage<'_, D> {
    fn page_name(&self) -> &'static str {
        "listing"
    }
}

impl<'a, D: BrowserDriver> ListingPage<'a, D> {
    pub(crate) fn new(session: &'a mut Session<D>) -> Self {
        Self {
            session,
            consent_dismissed: false,
        }
    }

    /// Whether the cookie consent overlay has been dismissed
    #[must_use]
    pub const fn consent_dismissed(&self) -> bool {
        self.consent_dismissed
    }

    /// Assert that the heading equals `expected`, ignoring surrounding whitespace
    pub async fn check_section(self, expected: &Subcategory) -> ShopcheckResult<Self> {
        let step = self.session.begin_step(format!("Check section {expected}"));
        let locator = self.session.layout().section_heading.clone();
        let waiter = *self.session.waiter();
        let want = expected.name().trim().to_string();
        let result = waiter
            .until_text(self.session.driver(), &locator, |text| text.trim() == want)
            .await
            .and_then(|outcome| {
                if outcome.matched {
                    Ok(())
                } else {
                    Err(ShopcheckError::SectionMismatch {
                        expected: want.clone(),
                        actual: outcome.text.trim().to_string(),
                    })
                }
            });
        self.session.finish_step(step, result).await?;
        info!(section = %expected, "section verified");
        Ok(self)
    }

    /// Dismiss the consent overlay (once), then tick each brand checkbox in order.
    ///
    /// An empty brand list only dismisses the overlay and leaves the listing
    /// unfiltered.
    pub async fn select_brands(mut self, brands: &BrandFilter) -> ShopcheckResult<Self> {
        let labels: Vec<String> = brands.iter().map(crate::filter::Brand::label).collect();
        let step = self
            .session
            .begin_step(format!("Filter by brands [{}]", labels.join(", ")));
        let result = self.apply_brands(&labels).await;
        self.session.finish_step(step, result).await?;
        info!(brands = ?labels, "brand filter applied");
        Ok(self)
    }

    async fn apply_brands(&mut self, labels: &[String]) -> ShopcheckResult<()> {
        let layout = self.session.layout().clone();
        if self.consent_dismissed {
            debug!("consent overlay already dismissed");
        } else {
            click_when(self.session, &layout.consent_button, Condition::Enabled).await?;
            self.consent_dismissed = true;
        }
        for label in labels {
            let checkbox = layout.brand_checkbox.with_arg(label);
            click_when(self.session, &checkbox, Condition::Enabled).await?;
            debug!(brand = %label, "brand checkbox clicked");
        }
        Ok(())
    }

    /// Wait for the first product, then for every product slot to exist
    pub async fn wait_for_products(self) -> ShopcheckResult<Self> {
        let step = self.session.begin_step("Wait for products to load");
        let result = self.await_products().await;
        let slots = self.session.finish_step(step, result).await?;
        info!(slots, "products loaded");
        Ok(self)
    }

    async fn await_products(&self) -> ShopcheckResult<usize> {
        let product = &self.session.layout().product;
        let waiter = self.session.waiter();
        let slot_timeout = self.session.config().pagination.slot_timeout_ms;
        waiter
            .until(self.session.driver(), product, Condition::Exists)
            .await?;
        waiter
            .each_slot_exists(self.session.driver(), product, slot_timeout)
            .await
    }

    /// Check every product on every result page against `filter`
    pub async fn verify_all_pages_match(
        mut self,
        filter: &FilterTerm,
    ) -> ShopcheckResult<PaginationReport> {
        let step = self
            .session
            .begin_step(format!("Check products match filter '{filter}'"));
        let result = self.traverse(filter).await;
        let report = self.session.finish_step(step, result).await?;
        info!(
            %filter,
            pages = report.pages,
            products = report.products_checked,
            "all pages match filter"
        );
        Ok(report)
    }

    async fn traverse(&mut self, filter: &FilterTerm) -> ShopcheckResult<PaginationReport> {
        let options = self.session.config().pagination.clone();
        let layout = self.session.layout().clone();
        let waiter = *self.session.waiter();
        let deadline = Deadline::after(Duration::from_millis(options.deadline_ms));
        let mut report = PaginationReport::default();
        let mut page = 1usize;

        loop {
            let driver = self.session.driver();
            let url = driver.current_url().await?;
            let products = driver.query_all(&layout.product.selector).await?;
            let mut titles = Vec::with_capacity(products.len());
            for product in &products {
                let title = driver.text(product).await?;
                let matched = filter.matches(&title);
                debug!(page, %title, matched, "product checked");
                if !matched {
                    match options.assertion_mode {
                        AssertionMode::FailFast => {
                            return Err(ShopcheckError::FilterMismatch {
                                filter: filter.to_string(),
                                title,
                                page,
                            });
                        }
                        AssertionMode::CollectAll => {
                            warn!(page, %title, "product does not match filter");
                            report.mismatches.push(Mismatch {
                                page,
                                title: title.clone(),
                            });
                        }
                    }
                }
                titles.push(title);
            }
            report.record_page(page, url.clone(), titles.len());
            info!(page, products = titles.len(), "page checked");

            let Some(next) = driver
                .query_all(&layout.next_page.selector)
                .await?
                .into_iter()
                .next()
            else {
                break;
            };
            if !driver.element_state(&next).await?.exists {
                break;
            }

            let bounds = match options.max_pages {
                Some(max_pages) if page >= max_pages => {
                    Err(ShopcheckError::PageLimitExceeded { max_pages })
                }
                _ => deadline.check(),
            };
            if let Err(e) = bounds {
                if report.mismatches.is_empty() {
                    return Err(e);
                }
                // Recorded mismatches outrank the bounds error.
                warn!(page, error = %e, "pagination stopped with mismatches recorded");
                break;
            }

            self.session.driver_mut().click(&next).await?;
            self.await_page_change(page, &url, &titles).await?;
            waiter
                .each_slot_exists(
                    self.session.driver(),
                    &layout.product,
                    options.slot_timeout_ms,
                )
                .await?;
            page += 1;
        }

        if !report.mismatches.is_empty() {
            return Err(ShopcheckError::FilterMismatches {
                filter: filter.to_string(),
                failures: report.mismatches.iter().map(ToString::to_string).collect(),
            });
        }
        Ok(report)
    }

    /// Poll until the URL or the product titles differ from the page just
    /// checked and at least one product is present.
    async fn await_page_change(
        &self,
        page: usize,
        url: &str,
        titles: &[String],
    ) -> ShopcheckResult<()> {
        let driver = self.session.driver();
        let product = &self.session.layout().product.selector;
        let options = self.session.waiter().options();
        let start = Instant::now();

        loop {
            let current_url = driver.current_url().await?;
            let products = driver.query_all(product).await?;
            if !products.is_empty() {
                let mut current = Vec::with_capacity(products.len());
                for handle in &products {
                    current.push(driver.text(handle).await?);
                }
                if current_url != url || current != titles {
                    debug!(from = page, to = page + 1, "listing advanced");
                    return Ok(());
                }
            }
            if start.elapsed() >= options.timeout() {
                return Err(ShopcheckError::driver(format!(
                    "next-page control did not advance past page {page} within {}ms",
                    options.timeout_ms
                )));
            }
            sleep(options.poll_interval()).await;
        }
    }
}
