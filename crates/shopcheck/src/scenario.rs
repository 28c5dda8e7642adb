//! Parameterized catalog scenario.
//!
//! One case is one walk through the storefront:
//! open → catalog → hover category → click subcategory → check section →
//! select brands → wait for products → verify every page matches the filter.
//!
//! Cases can be loaded from YAML:
//!
//! ```yaml
//! - category: Смартфоны
//!   brands: [Apple]
//!   filter: iPhone
//! - category: Смартфоны
//!   brands: [Samsung, Xiaomi]
//!   filter: Galaxy
//! ```

use crate::driver::BrowserDriver;
use crate::filter::{BrandFilter, Category, FilterTerm, Subcategory};
use crate::pages::{MainPage, PaginationReport};
use crate::result::{ShopcheckError, ShopcheckResult};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Scenario display name, followed by the case arguments
pub const SCENARIO_NAME: &str = "Smartphone section check";

/// One parameter tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCase {
    /// Top-level catalog category to hover
    pub category: Category,
    /// Subcategory to open; defaults to the category name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<Subcategory>,
    /// Brands to tick, in order
    #[serde(default)]
    pub brands: BrandFilter,
    /// Term every product title must contain
    pub filter: FilterTerm,
}

impl ScenarioCase {
    /// Create a case
    #[must_use]
    pub fn new(category: Category, brands: BrandFilter, filter: FilterTerm) -> Self {
        Self {
            category,
            subcategory: None,
            brands,
            filter,
        }
    }

    /// Open a subcategory whose name differs from the category
    #[must_use]
    pub fn with_subcategory(mut self, subcategory: Subcategory) -> Self {
        self.subcategory = Some(subcategory);
        self
    }

    /// Smartphones filtered by Apple, every title must contain "iPhone"
    pub fn smartphones() -> ShopcheckResult<Self> {
        Ok(Self::new(
            Category::new("Смартфоны"),
            BrandFilter::new(["Apple"]),
            FilterTerm::new("iPhone")?,
        ))
    }

    /// Subcategory to open and expect as the section heading
    #[must_use]
    pub fn subcategory(&self) -> Subcategory {
        self.subcategory
            .clone()
            .unwrap_or_else(|| Subcategory::from(&self.category))
    }

    /// Name shown in reports: scenario name plus arguments
    #[must_use]
    pub fn display_name(&self) -> String {
        let brands: Vec<&str> = self.brands.iter().map(crate::filter::Brand::name).collect();
        format!(
            "{SCENARIO_NAME} [{}, [{}], {}]",
            self.category,
            brands.join(", "),
            self.filter
        )
    }

    /// Arguments as name/value pairs
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, String)> {
        let brands: Vec<&str> = self.brands.iter().map(crate::filter::Brand::name).collect();
        vec![
            ("category".to_string(), self.category.to_string()),
            ("subcategory".to_string(), self.subcategory().to_string()),
            ("brands".to_string(), brands.join(", ")),
            ("filter".to_string(), self.filter.to_string()),
        ]
    }
}

/// Cases run when none are supplied
pub fn default_cases() -> ShopcheckResult<Vec<ScenarioCase>> {
    Ok(vec![ScenarioCase::smartphones()?])
}

/// Parse a YAML list of cases
pub fn parse_cases(yaml: &str) -> ShopcheckResult<Vec<ScenarioCase>> {
    let cases: Vec<ScenarioCase> = serde_yaml_ng::from_str(yaml)?;
    if cases.is_empty() {
        return Err(ShopcheckError::invalid_argument("case list is empty"));
    }
    Ok(cases)
}

/// Load a YAML list of cases from a file
pub fn load_cases(path: impl AsRef<Path>) -> ShopcheckResult<Vec<ScenarioCase>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_cases(&text)
}

/// Run one case on `session`, reporting it as a scenario
pub async fn run_case<D: BrowserDriver>(
    session: &mut Session<D>,
    case: &ScenarioCase,
) -> ShopcheckResult<PaginationReport> {
    session.start_scenario(case.display_name(), case.parameters());
    let result = walk(session, case).await;
    session.finish_scenario(&result);
    if let Ok(report) = &result {
        info!(
            pages = report.pages,
            products = report.products_checked,
            "case passed"
        );
    }
    result
}

async fn walk<D: BrowserDriver>(
    session: &mut Session<D>,
    case: &ScenarioCase,
) -> ShopcheckResult<PaginationReport> {
    let subcategory = case.subcategory();
    MainPage::open(session)
        .await?
        .click_catalog()
        .await?
        .hover_category(&case.category)
        .await?
        .click_subcategory(&subcategory)
        .await?
        .check_section(&subcategory)
        .await?
        .select_brands(&case.brands)
        .await?
        .wait_for_products()
        .await?
        .verify_all_pages_match(&case.filter)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    mod case_tests {
        use super::*;

        #[test]
        fn test_smartphones_case() {
            let case = ScenarioCase::smartphones().unwrap();
            assert_eq!(case.category.name(), "Смартфоны");
            assert_eq!(case.subcategory().name(), "Смартфоны");
            assert_eq!(case.brands, BrandFilter::new(["Apple"]));
            assert_eq!(case.filter.as_str(), "iPhone");
        }

        #[test]
        fn test_display_name_lists_arguments() {
            let case = ScenarioCase::smartphones().unwrap();
            assert_eq!(
                case.display_name(),
                "Smartphone section check [Смартфоны, [Apple], iPhone]"
            );
        }

        #[test]
        fn test_explicit_subcategory() {
            let case = ScenarioCase::smartphones()
                .unwrap()
                .with_subcategory(Subcategory::new("Смартфоны и гаджеты"));
            assert_eq!(case.subcategory().name(), "Смартфоны и гаджеты");
            assert_eq!(case.parameters()[1].1, "Смартфоны и гаджеты");
        }

        #[test]
        fn test_default_cases() {
            assert_eq!(default_cases().unwrap().len(), 1);
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_cases() {
            let cases = parse_cases(
                "- category: Смартфоны\n  brands: [Apple]\n  filter: iPhone\n\
                 - category: Смартфоны\n  filter: Galaxy\n",
            )
            .unwrap();
            assert_eq!(cases.len(), 2);
            assert!(cases[1].brands.is_empty());
        }

        #[test]
        fn test_empty_filter_rejected() {
            assert!(parse_cases("- category: Смартфоны\n  filter: ''\n").is_err());
        }

        #[test]
        fn test_empty_list_rejected() {
            assert!(matches!(
                parse_cases("[]"),
                Err(ShopcheckError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_load_cases_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            assert!(matches!(
                load_cases(dir.path().join("cases.yaml")),
                Err(ShopcheckError::Io(_))
            ));
        }
    }
}
