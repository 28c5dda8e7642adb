//! Shopcheck: Page-Object Browser Checks for Paginated Storefront Catalogs
//!
//! Drives a real browser through a storefront catalog, applies a brand filter
//! and asserts that every product on every result page matches the filter term.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SHOPCHECK Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Scenario   │───►│ Page       │───►│ Session            │    │
//! │   │ Cases      │    │ Objects    │    │ (steps, capture)   │    │
//! │   └────────────┘    └────────────┘    └─────────┬──────────┘    │
//! │                           │                     │               │
//! │                           ▼                     ▼               │
//! │                    ┌────────────┐    ┌────────────────────┐     │
//! │                    │ Waiter     │───►│ BrowserDriver      │     │
//! │                    │ (polling)  │    │ Chromium | Mock    │     │
//! │                    └────────────┘    └────────────────────┘     │
//! │                                                 │               │
//! │                                                 ▼               │
//! │                                      ┌────────────────────┐     │
//! │                                      │ Reporter           │     │
//! │                                      │ JSON / HTML / JUnit│     │
//! │                                      └────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use shopcheck::{run_case, ScenarioCase, Session, StorefrontBuilder, SuiteConfig};
//!
//! # async fn demo() -> shopcheck::ShopcheckResult<()> {
//! let site = "https://www.citilink.ru";
//! let driver = StorefrontBuilder::new(site, "Смартфоны")
//!     .brands(&["APPLE"])
//!     .page(&["Смартфон Apple iPhone 15", "Смартфон Apple iPhone 14"])
//!     .build();
//! let mut session = Session::new(driver, SuiteConfig::new(site));
//! let report = run_case(&mut session, &ScenarioCase::smartphones()?).await?;
//! println!("{} products checked", report.products_checked);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml

mod config;
mod driver;
mod filter;
mod locator;
mod result;
mod scenario;
mod session;
mod site;
mod wait;

/// Report events, records and HTML/JUnit/JSON output
pub mod reporter;

/// Scripted in-memory driver for tests and dry runs
pub mod mock;

/// Page objects for the catalog walk
pub mod pages;

/// Chromium driver over CDP
#[cfg(feature = "browser")]
pub mod chromium;

pub use config::{Properties, SuiteConfig, DEFAULT_REPORT_DIR, SITE_URL_KEY};
pub use driver::{
    BrowserDriver, ConsoleEntry, DriverConfig, ElementHandle, ElementState, LogLevel, Screenshot,
};
pub use filter::{Brand, BrandFilter, Category, FilterTerm, Subcategory};
pub use locator::{Condition, Locator, Selector, TEMPLATE_PLACEHOLDER};
pub use mock::{ClickEffect, MockDriver, MockElement, MockScreen, StorefrontBuilder};
pub use pages::{
    AssertionMode, CatalogPage, ListingPage, MainPage, Mismatch, PageObject, PageSummary,
    PaginationOptions, PaginationReport,
};
pub use reporter::{
    Attachment, Parameter, ReportEvent, Reporter, ScenarioRecord, StepEvent, StepRecord,
    StepStatus, TestStatus,
};
pub use result::{ShopcheckError, ShopcheckResult};
pub use scenario::{
    default_cases, load_cases, parse_cases, run_case, ScenarioCase, SCENARIO_NAME,
};
pub use session::{CaptureOptions, Session, Step};
pub use site::SiteLayout;
pub use wait::{
    Deadline, TextWait, WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SLOT_TIMEOUT_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
