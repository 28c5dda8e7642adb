//! Locator abstraction for element selection.
//!
//! Locators are declarative: they describe *what* to find, the driver decides
//! *how*. Page objects keep one locator per user-visible affordance and pass
//! it to the [`Waiter`](crate::wait::Waiter) together with a [`Condition`].
//!
//! Templated selectors carry a single `%s` placeholder that is filled with a
//! display name (category, subcategory, brand label) right before the lookup.

use serde::{Deserialize, Serialize};

/// Placeholder substituted by [`Locator::with_arg`]
pub const TEMPLATE_PLACEHOLDER: &str = "%s";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "query", rename_all = "lowercase")]
pub enum Selector {
    /// CSS selector (e.g., "a[data-meta-name='Catalog']")
    Css(String),
    /// XPath selector
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Raw query string
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }

    /// Whether the query still contains a template placeholder
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.query().contains(TEMPLATE_PLACEHOLDER)
    }

    /// Substitute every placeholder with `arg`.
    ///
    /// In XPath, a quoted placeholder (`'%s'` or `"%s"`) becomes a string
    /// literal that can hold any quote `arg` contains.
    #[must_use]
    pub fn render(&self, arg: &str) -> Self {
        match self {
            Self::Css(s) => Self::Css(s.replace(TEMPLATE_PLACEHOLDER, arg)),
            Self::XPath(s) => {
                let literal = xpath_literal(arg);
                let query = s
                    .replace(&format!("'{TEMPLATE_PLACEHOLDER}'"), &literal)
                    .replace(&format!("\"{TEMPLATE_PLACEHOLDER}\""), &literal)
                    .replace(TEMPLATE_PLACEHOLDER, arg);
                Self::XPath(query)
            }
        }
    }
}

/// XPath 1.0 string literal for `value`; `concat()` when it holds both quotes
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

impl std::str::FromStr for Selector {
    type Err = crate::result::ShopcheckError;

    /// Parse `css=...` / `xpath=...`; unprefixed queries starting with `/` or
    /// `(` are XPath, anything else CSS.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(crate::result::ShopcheckError::config("empty selector"));
        }
        if let Some(q) = s.strip_prefix("css=") {
            return Ok(Self::css(q));
        }
        if let Some(q) = s.strip_prefix("xpath=") {
            return Ok(Self::xpath(q));
        }
        if s.starts_with('/') || s.starts_with('(') {
            Ok(Self::xpath(s))
        } else {
            Ok(Self::css(s))
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Condition an element must reach before an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Present in the DOM, regardless of visibility
    Exists,
    /// Rendered and visible
    Visible,
    /// Not disabled
    Enabled,
}

impl Condition {
    /// Word used in error messages ("was not ...")
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "present",
            Self::Visible => "visible",
            Self::Enabled => "enabled",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Selector used for lookup
    pub selector: Selector,
    /// Human-readable description for logs and errors
    pub description: String,
}

impl Locator {
    /// Create a locator from a selector and description
    #[must_use]
    pub fn new(selector: Selector, description: impl Into<String>) -> Self {
        Self {
            selector,
            description: description.into(),
        }
    }

    /// CSS locator
    #[must_use]
    pub fn css(query: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Selector::css(query), description)
    }

    /// XPath locator
    #[must_use]
    pub fn xpath(query: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Selector::xpath(query), description)
    }

    /// Fill the template placeholder, appending the argument to the description
    #[must_use]
    pub fn with_arg(&self, arg: &str) -> Self {
        Self {
            selector: self.selector.render(arg),
            description: format!("{} '{arg}'", self.description),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description, self.selector)
    }
}
