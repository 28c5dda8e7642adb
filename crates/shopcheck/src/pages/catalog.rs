//! Catalog menu: categories open on hover, subcategories navigate on click.

use super::{click_when, hover_when, ListingPage, PageObject};
use crate::driver::BrowserDriver;
use crate::filter::{Category, Subcategory};
use crate::locator::Condition;
use crate::result::ShopcheckResult;
use crate::session::Session;
use tracing::info;

/// The open catalog menu
#[derive(Debug)]
pub struct CatalogPage<'a, D: BrowserDriver> {
    session: &'a mut Session<D>,
}

impl<D: BrowserDriver> PageObject for CatalogPage<'_, D> {
    fn page_name(&self) -> &'static str {
        "catalog menu"
    }
}

impl<'a, D: BrowserDriver> CatalogPage<'a, D> {
    pub(crate) fn new(session: &'a mut Session<D>) -> Self {
        Self { session }
    }

    /// Hover a top-level category to reveal its subcategories
    pub async fn hover_category(self, category: &Category) -> ShopcheckResult<Self> {
        let step = self.session.begin_step(format!("Hover category {category}"));
        let locator = self.session.layout().category_link.with_arg(category.name());
        let result = hover_when(self.session, &locator, Condition::Visible).await;
        self.session.finish_step(step, result).await?;
        info!(%category, "category hovered");
        Ok(self)
    }

    /// Click a subcategory link
    pub async fn click_subcategory(
        self,
        subcategory: &Subcategory,
    ) -> ShopcheckResult<ListingPage<'a, D>> {
        let step = self
            .session
            .begin_step(format!("Open subcategory {subcategory}"));
        let locator = self
            .session
            .layout()
            .subcategory_link
            .with_arg(subcategory.name());
        let result = click_when(self.session, &locator, Condition::Visible).await;
        self.session.finish_step(step, result).await?;
        info!(page = self.page_name(), %subcategory, "subcategory opened");
        Ok(ListingPage::new(self.session))
    }
}
