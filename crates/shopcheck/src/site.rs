//! Storefront markup: every locator the page objects use.
//!
//! Defaults follow the Citilink desktop layout. Templated locators carry a
//! `%s` placeholder filled with a display name at lookup time. Any locator
//! can be replaced from configuration with a `layout.<name>` property whose
//! value is a selector string (`css=...`, `xpath=...`, or a bare query).

use crate::locator::{Locator, Selector};
use crate::result::{ShopcheckError, ShopcheckResult};
use serde::{Deserialize, Serialize};

/// Locators for one storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLayout {
    /// Header button opening the catalog menu
    pub catalog_button: Locator,
    /// Top-level category entry in the catalog menu (template)
    pub category_link: Locator,
    /// Subcategory link revealed by hovering a category (template)
    pub subcategory_link: Locator,
    /// Listing page heading
    pub section_heading: Locator,
    /// Brand filter checkbox (template, upper-cased brand label)
    pub brand_checkbox: Locator,
    /// Cookie consent accept button
    pub consent_button: Locator,
    /// Product snippet in the listing
    pub product: Locator,
    /// Next-page pagination link
    pub next_page: Locator,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            catalog_button: Locator::css(
                "a[data-meta-name='DesktopHeaderFixed__catalog-menu']",
                "catalog button",
            ),
            category_link: Locator::xpath(
                "//a[contains(@class, 'CatalogLayout__link_level-1') and contains(., '%s')]",
                "category link",
            ),
            subcategory_link: Locator::xpath(
                "//li[@class='CatalogLayout__children-item']//a[text()='%s']",
                "subcategory link",
            ),
            section_heading: Locator::xpath(
                "//div[@data-meta-name='SubcategoryPageTitle']//h1",
                "section heading",
            ),
            brand_checkbox: Locator::xpath(
                "//div[@data-meta-name='FilterLabel' and @data-meta-value='%s']//input",
                "brand checkbox",
            ),
            consent_button: Locator::xpath(
                "//button[span[text()='Я согласен']]",
                "cookie consent button",
            ),
            product: Locator::xpath(
                "//div[@data-meta-name='ProductVerticalSnippet']",
                "product snippet",
            ),
            next_page: Locator::xpath(
                "//a[@data-meta-name='PageLink__page-page-next']",
                "next page link",
            ),
        }
    }
}

impl SiteLayout {
    /// Names accepted by [`SiteLayout::set_selector`]
    pub const FIELDS: [&'static str; 8] = [
        "catalog_button",
        "category_link",
        "subcategory_link",
        "section_heading",
        "brand_checkbox",
        "consent_button",
        "product",
        "next_page",
    ];

    fn field_mut(&mut self, name: &str) -> Option<&mut Locator> {
        match name {
            "catalog_button" => Some(&mut self.catalog_button),
            "category_link" => Some(&mut self.category_link),
            "subcategory_link" => Some(&mut self.subcategory_link),
            "section_heading" => Some(&mut self.section_heading),
            "brand_checkbox" => Some(&mut self.brand_checkbox),
            "consent_button" => Some(&mut self.consent_button),
            "product" => Some(&mut self.product),
            "next_page" => Some(&mut self.next_page),
            _ => None,
        }
    }

    /// Replace the selector of one locator, keeping its description
    pub fn set_selector(&mut self, name: &str, selector: Selector) -> ShopcheckResult<()> {
        let templated = matches!(name, "category_link" | "subcategory_link" | "brand_checkbox");
        let locator = self
            .field_mut(name)
            .ok_or_else(|| ShopcheckError::config(format!("unknown layout locator '{name}'")))?;
        if templated && !selector.is_template() {
            return Err(ShopcheckError::config(format!(
                "layout locator '{name}' needs a '%s' placeholder"
            )));
        }
        locator.selector = selector;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_have_placeholders() {
        let layout = SiteLayout::default();
        assert!(layout.category_link.selector.is_template());
        assert!(layout.subcategory_link.selector.is_template());
        assert!(layout.brand_checkbox.selector.is_template());
        assert!(!layout.product.selector.is_template());
    }

    #[test]
    fn test_brand_checkbox_renders_label() {
        let layout = SiteLayout::default();
        let filled = layout.brand_checkbox.with_arg("APPLE");
        assert_eq!(
            filled.selector.query(),
            "//div[@data-meta-name='FilterLabel' and @data-meta-value='APPLE']//input"
        );
    }

    #[test]
    fn test_set_selector() {
        let mut layout = SiteLayout::default();
        layout
            .set_selector("product", Selector::css("div.snippet"))
            .unwrap();
        assert_eq!(layout.product.selector, Selector::css("div.snippet"));
        assert_eq!(layout.product.description, "product snippet");
    }

    #[test]
    fn test_set_selector_rejects_unknown_and_untemplated() {
        let mut layout = SiteLayout::default();
        assert!(layout.set_selector("footer", Selector::css("x")).is_err());
        assert!(layout
            .set_selector("brand_checkbox", Selector::css("input.brand"))
            .is_err());
    }

    #[test]
    fn test_fields_are_all_settable() {
        let mut layout = SiteLayout::default();
        for name in SiteLayout::FIELDS {
            assert!(layout.set_selector(name, Selector::css("a[title='%s']")).is_ok());
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml =
            "product:\n  selector:\n    kind: css\n    query: div.card\n  description: card\n";
        let layout: SiteLayout = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(layout.product.selector, Selector::css("div.card"));
        assert_eq!(layout.next_page, SiteLayout::default().next_page);
    }
}
