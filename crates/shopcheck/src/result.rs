//! Result and error types for Shopcheck.

use thiserror::Error;

/// Result type for Shopcheck operations
pub type ShopcheckResult<T> = Result<T, ShopcheckError>;

/// Errors that can occur while driving a storefront scenario
#[derive(Debug, Error)]
pub enum ShopcheckError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Low-level driver failure (CDP call, element interaction)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// A wait condition was not met within its window
    #[error("Element not found: {description} was not {condition} within {timeout_ms}ms")]
    ElementNotFound {
        /// Locator description
        description: String,
        /// Condition that was waited for
        condition: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A product title does not contain the filter term
    #[error("Product on page {page} must match filter '{filter}', got '{title}'")]
    FilterMismatch {
        /// Active filter term
        filter: String,
        /// Offending product title
        title: String,
        /// 1-based result page number
        page: usize,
    },

    /// Several product titles do not contain the filter term
    #[error(
        "{} product(s) do not match filter '{filter}': {}",
        .failures.len(),
        .failures.join("; ")
    )]
    FilterMismatches {
        /// Active filter term
        filter: String,
        /// Offending titles, prefixed with their page number
        failures: Vec<String>,
    },

    /// The section heading differs from the expected name
    #[error("Section heading mismatch: expected '{expected}', got '{actual}'")]
    SectionMismatch {
        /// Expected heading text
        expected: String,
        /// Rendered heading text
        actual: String,
    },

    /// Pagination visited more pages than allowed
    #[error("Pagination exceeded {max_pages} page(s); next-page control never disappeared")]
    PageLimitExceeded {
        /// Configured page cap
        max_pages: usize,
    },

    /// Pagination ran past its cumulative deadline
    #[error("Pagination deadline exceeded: {elapsed_ms}ms elapsed of {deadline_ms}ms")]
    DeadlineExceeded {
        /// Elapsed time in milliseconds
        elapsed_ms: u64,
        /// Deadline in milliseconds
        deadline_ms: u64,
    },

    /// A required property key is absent
    #[error("Missing required property '{key}'")]
    MissingProperty {
        /// Property key
        key: String,
    },

    /// Configuration value could not be used
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument (empty filter term, bad case definition)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Screenshot, page source or log capture failed
    #[error("Capture failed: {message}")]
    Capture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ShopcheckError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a capture error
    #[must_use]
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Whether this error is an assertion failure rather than a broken step.
    ///
    /// Assertion failures report as `failed`, everything else as `broken`.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::FilterMismatch { .. }
                | Self::FilterMismatches { .. }
                | Self::SectionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_mismatch_names_term_and_title() {
        let err = ShopcheckError::FilterMismatch {
            filter: "iPhone".to_string(),
            title: "Samsung Galaxy S24".to_string(),
            page: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("iPhone"));
        assert!(msg.contains("Samsung Galaxy S24"));
        assert!(msg.contains("page 2"));
    }

    #[test]
    fn test_filter_mismatches_counts_failures() {
        let err = ShopcheckError::FilterMismatches {
            filter: "iPhone".to_string(),
            failures: vec!["p1: Pixel 8".to_string(), "p3: Galaxy".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 product(s)"));
        assert!(msg.contains("p1: Pixel 8; p3: Galaxy"));
    }

    #[test]
    fn test_element_not_found_message() {
        let err = ShopcheckError::ElementNotFound {
            description: "catalog button".to_string(),
            condition: "visible".to_string(),
            timeout_ms: 6000,
        };
        assert_eq!(
            err.to_string(),
            "Element not found: catalog button was not visible within 6000ms"
        );
    }

    #[test]
    fn test_is_assertion() {
        assert!(ShopcheckError::SectionMismatch {
            expected: "Смартфоны".to_string(),
            actual: "Ноутбуки".to_string(),
        }
        .is_assertion());
        assert!(!ShopcheckError::driver("boom").is_assertion());
        assert!(!ShopcheckError::PageLimitExceeded { max_pages: 3 }.is_assertion());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ShopcheckError = io.into();
        assert!(matches!(err, ShopcheckError::Io(_)));
    }
}
