//! Catalog vocabulary: categories, brands and the filter-match predicate.

use crate::result::{ShopcheckError, ShopcheckResult};
use serde::{Deserialize, Serialize};

/// Substring every product title must contain, compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterTerm {
    term: String,
    normalized: String,
}

impl FilterTerm {
    /// Create a filter term; empty or whitespace-only terms are rejected
    pub fn new(term: impl Into<String>) -> ShopcheckResult<Self> {
        let term = term.into();
        if term.trim().is_empty() {
            return Err(ShopcheckError::invalid_argument("filter term must not be empty"));
        }
        let normalized = term.to_uppercase();
        Ok(Self { term, normalized })
    }

    /// Term as given
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.term
    }

    /// `upper(title)` contains `upper(term)`
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        title.to_uppercase().contains(&self.normalized)
    }
}

impl TryFrom<String> for FilterTerm {
    type Error = ShopcheckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilterTerm> for String {
    fn from(value: FilterTerm) -> Self {
        value.term
    }
}

impl std::fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.term)
    }
}

/// Brand name as typed by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brand(String);

impl Brand {
    /// Create a brand
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as given
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Label of the filter control; the storefront labels brands in upper case
    #[must_use]
    pub fn label(&self) -> String {
        self.0.trim().to_uppercase()
    }
}

impl std::fmt::Display for Brand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of brands to tick; may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandFilter(Vec<Brand>);

impl BrandFilter {
    /// Build from names, preserving order
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Brand::new).collect())
    }

    /// Brands in order
    pub fn iter(&self) -> std::slice::Iter<'_, Brand> {
        self.0.iter()
    }

    /// Number of brands
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no brand is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a BrandFilter {
    type Item = &'a Brand;
    type IntoIter = std::slice::Iter<'a, Brand>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Top-level catalog section, identified by its display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Create a category
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Section nested under a [`Category`]; its name is also the listing heading
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subcategory(String);

impl Subcategory {
    /// Create a subcategory
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&Category> for Subcategory {
    fn from(category: &Category) -> Self {
        Self(category.0.clone())
    }
}

impl std::fmt::Display for Subcategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod filter_term_tests {
        use super::*;

        #[test]
        fn test_case_insensitive_match() {
            let term = FilterTerm::new("iphone").unwrap();
            assert!(term.matches("Apple iPhone 15"));
            assert!(term.matches("IPHONE 15 PRO"));
            assert!(!term.matches("Samsung Galaxy S24"));
        }

        #[test]
        fn test_plain_substring_no_word_boundary() {
            let term = FilterTerm::new("phone").unwrap();
            assert!(term.matches("Apple iPhone 15"));
        }

        #[test]
        fn test_cyrillic_case_folding() {
            let term = FilterTerm::new("смартфон").unwrap();
            assert!(term.matches("СМАРТФОН Apple iPhone 15 128Gb"));
        }

        #[test]
        fn test_empty_rejected() {
            assert!(matches!(
                FilterTerm::new(""),
                Err(ShopcheckError::InvalidArgument { .. })
            ));
            assert!(FilterTerm::new("   ").is_err());
        }

        #[test]
        fn test_serde_validates() {
            let term: FilterTerm = serde_yaml_ng::from_str("iPhone").unwrap();
            assert_eq!(term.as_str(), "iPhone");
            assert!(serde_yaml_ng::from_str::<FilterTerm>("''").is_err());
        }
    }

    mod brand_tests {
        use super::*;

        #[test]
        fn test_label_is_upper_case() {
            assert_eq!(Brand::new("apple").label(), "APPLE");
            assert_eq!(Brand::new("APPLE").label(), Brand::new("Apple").label());
        }

        #[test]
        fn test_brand_filter_keeps_order() {
            let filter = BrandFilter::new(["Xiaomi", "Apple"]);
            let labels: Vec<String> = filter.iter().map(Brand::label).collect();
            assert_eq!(labels, vec!["XIAOMI", "APPLE"]);
        }

        #[test]
        fn test_empty_brand_filter() {
            let filter = BrandFilter::default();
            assert!(filter.is_empty());
            assert_eq!(filter.len(), 0);
        }

        #[test]
        fn test_subcategory_from_category() {
            let category = Category::new("Смартфоны");
            assert_eq!(Subcategory::from(&category).name(), "Смартфоны");
        }
    }

    proptest! {
        #[test]
        fn prop_term_matches_any_title_containing_it(
            prefix in "[a-zA-Z0-9 ]{0,12}",
            term in "[a-zA-Z]{1,8}",
            suffix in "[a-zA-Z0-9 ]{0,12}",
        ) {
            let filter = FilterTerm::new(term.clone()).unwrap();
            let title = format!("{prefix}{}{suffix}", term.to_lowercase());
            prop_assert!(filter.matches(&title));
            let shouted = format!("{prefix}{}{suffix}", term.to_uppercase());
            prop_assert!(filter.matches(&shouted));
        }

        #[test]
        fn prop_match_ignores_term_case(term in "[a-zA-Z]{1,8}", title in "[a-zA-Z ]{0,24}") {
            let lower = FilterTerm::new(term.to_lowercase()).unwrap();
            let upper = FilterTerm::new(term.to_uppercase()).unwrap();
            prop_assert_eq!(lower.matches(&title), upper.matches(&title));
        }

        #[test]
        fn prop_brand_label_case_insensitive(name in "[a-zA-Z]{1,10}") {
            prop_assert_eq!(
                Brand::new(name.to_lowercase()).label(),
                Brand::new(name.to_uppercase()).label()
            );
        }
    }
}
