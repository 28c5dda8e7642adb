//! Storefront landing page.

use super::{click_when, CatalogPage, PageObject};
use crate::driver::BrowserDriver;
use crate::locator::Condition;
use crate::result::ShopcheckResult;
use crate::session::Session;
use tracing::info;

/// The landing page, reached by opening the configured site URL
#[derive(Debug)]
pub struct MainPage<'a, D: BrowserDriver> {
    session: &'a mut Session<D>,
}

impl<D: BrowserDriver> PageObject for MainPage<'_, D> {
    fn page_name(&self) -> &'static str {
        "main page"
    }
}

impl<'a, D: BrowserDriver> MainPage<'a, D> {
    /// Navigate to the configured site URL
    pub async fn open(session: &'a mut Session<D>) -> ShopcheckResult<Self> {
        let url = session.config().site_url.clone();
        let step = session.begin_step(format!("Open {url}"));
        let result = session.driver_mut().navigate(&url).await;
        session.finish_step(step, result).await?;
        info!(%url, "site opened");
        Ok(Self { session })
    }

    /// Open the catalog menu
    pub async fn click_catalog(self) -> ShopcheckResult<CatalogPage<'a, D>> {
        let step = self.session.begin_step("Open catalog menu");
        let locator = self.session.layout().catalog_button.clone();
        let result = click_when(self.session, &locator, Condition::Visible).await;
        self.session.finish_step(step, result).await?;
        info!(page = self.page_name(), "catalog menu opened");
        Ok(CatalogPage::new(self.session))
    }
}
