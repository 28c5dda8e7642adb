//! Suite configuration.
//!
//! Configuration is loaded once, at process start, into an explicit
//! [`SuiteConfig`] that is handed to each [`Session`](crate::session::Session).
//! There is no global.
//!
//! The source is a flat property file written as YAML. Nested mappings are
//! flattened with dots, so both of these yield the key `site.url`:
//!
//! ```yaml
//! site.url: https://www.citilink.ru/
//! site:
//!   url: https://www.citilink.ru/
//! ```

use crate::driver::{DriverConfig, LogLevel};
use crate::locator::Selector;
use crate::pages::{AssertionMode, PaginationOptions};
use crate::result::{ShopcheckError, ShopcheckResult};
use crate::session::CaptureOptions;
use crate::site::SiteLayout;
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Required key holding the storefront base URL
pub const SITE_URL_KEY: &str = "site.url";

/// Default report directory
pub const DEFAULT_REPORT_DIR: &str = "target/shopcheck";

// =============================================================================
// PROPERTIES
// =============================================================================

/// Flat key/value property source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    /// Empty property source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file. A missing file is logged and yields no properties.
    pub fn load(path: impl AsRef<Path>) -> ShopcheckResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "property file not found, continuing without it");
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        let props = Self::from_yaml(&text)?;
        debug!(path = %path.display(), keys = props.len(), "loaded properties");
        Ok(props)
    }

    /// Parse YAML text
    pub fn from_yaml(yaml: &str) -> ShopcheckResult<Self> {
        let value: Value = serde_yaml_ng::from_str(yaml)?;
        let mut props = Self::new();
        match value {
            Value::Null => {}
            Value::Mapping(_) => flatten("", &value, &mut props.values)?,
            _ => {
                return Err(ShopcheckError::config(
                    "property file must be a mapping of keys to values",
                ))
            }
        }
        Ok(props)
    }

    /// Raw value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value parsed with [`FromStr`]; `None` when absent
    pub fn get_parsed<T>(&self, key: &str) -> ShopcheckResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    ShopcheckError::config(format!("invalid value '{raw}' for '{key}': {e}"))
                })
            })
            .transpose()
    }

    /// Set a value, replacing any previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Keys with the given prefix, prefix stripped
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.values
            .iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|rest| (rest, v.as_str())))
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) -> ShopcheckResult<()> {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = scalar(k).ok_or_else(|| {
                    ShopcheckError::config(format!("non-scalar property key under '{prefix}'"))
                })?;
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&full, v, out)?;
            }
        }
        Value::Sequence(items) => {
            let joined = items.iter().filter_map(scalar).collect::<Vec<_>>().join(",");
            out.insert(prefix.to_string(), joined);
        }
        Value::Null => {}
        other => {
            if let Some(s) = scalar(other) {
                out.insert(prefix.to_string(), s);
            }
        }
    }
    Ok(())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// SUITE CONFIG
// =============================================================================

/// Resolved configuration for one suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Storefront base URL
    pub site_url: String,
    /// Browser launch settings
    pub driver: DriverConfig,
    /// Element wait settings
    pub wait: WaitOptions,
    /// Pagination bounds and assertion policy
    pub pagination: PaginationOptions,
    /// Artifacts captured per step
    pub capture: CaptureOptions,
    /// Storefront locators
    pub layout: SiteLayout,
    /// Where reports are written
    pub report_dir: PathBuf,
}

impl SuiteConfig {
    /// Defaults for `site_url`
    #[must_use]
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            driver: DriverConfig::default(),
            wait: WaitOptions::default(),
            pagination: PaginationOptions::default(),
            capture: CaptureOptions::default(),
            layout: SiteLayout::default(),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }

    /// Resolve from properties. `site.url` is required.
    pub fn from_properties(props: &Properties) -> ShopcheckResult<Self> {
        let site_url = props
            .get(SITE_URL_KEY)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ShopcheckError::MissingProperty {
                key: SITE_URL_KEY.to_string(),
            })?;
        let mut config = Self::new(site_url);

        if let Some(headless) = props.get_parsed::<bool>("browser.headless")? {
            config.driver.headless = headless;
        }
        if let Some(width) = props.get_parsed::<u32>("browser.width")? {
            config.driver.viewport_width = width;
        }
        if let Some(height) = props.get_parsed::<u32>("browser.height")? {
            config.driver.viewport_height = height;
        }
        if let Some(path) = props.get("browser.executable") {
            config.driver.executable_path = Some(path.to_string());
        }
        if let Some(sandbox) = props.get_parsed::<bool>("browser.sandbox")? {
            config.driver.sandbox = sandbox;
        }

        if let Some(timeout) = props.get_parsed::<u64>("wait.timeout_ms")? {
            config.wait.timeout_ms = timeout;
        }
        if let Some(poll) = props.get_parsed::<u64>("wait.poll_ms")? {
            if poll == 0 {
                return Err(ShopcheckError::config("wait.poll_ms must be positive"));
            }
            config.wait.poll_interval_ms = poll;
        }

        if let Some(max_pages) = props.get_parsed::<usize>("pagination.max_pages")? {
            config.pagination.max_pages = (max_pages > 0).then_some(max_pages);
        }
        if let Some(deadline) = props.get_parsed::<u64>("pagination.deadline_ms")? {
            config.pagination.deadline_ms = deadline;
        }
        if let Some(slot) = props.get_parsed::<u64>("pagination.slot_timeout_ms")? {
            config.pagination.slot_timeout_ms = slot;
        }
        if let Some(mode) = props.get_parsed::<AssertionMode>("pagination.mode")? {
            config.pagination.assertion_mode = mode;
        }

        if let Some(screens) = props.get_parsed::<bool>("capture.screenshots")? {
            config.capture.screenshots = screens;
        }
        if let Some(source) = props.get_parsed::<bool>("capture.page_source")? {
            config.capture.page_source = source;
        }
        if let Some(levels) = props.get("capture.console") {
            config.capture.console_levels = levels
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(LogLevel::from_str)
                .collect::<ShopcheckResult<Vec<_>>>()?;
        }

        for (name, raw) in props.with_prefix("layout.") {
            config.layout.set_selector(name, raw.parse::<Selector>()?)?;
        }

        if let Some(dir) = props.get("report.dir") {
            config.report_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ShopcheckResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod properties_tests {
        use super::*;

        #[test]
        fn test_flat_and_nested_keys() {
            let props = Properties::from_yaml(
                "site.url: https://shop.test/\n\
                 wait:\n  timeout_ms: 100\n\
                 browser:\n  headless: false\n",
            )
            .unwrap();
            assert_eq!(props.get("site.url"), Some("https://shop.test/"));
            assert_eq!(props.get("wait.timeout_ms"), Some("100"));
            assert_eq!(props.get("browser.headless"), Some("false"));
        }

        #[test]
        fn test_sequence_joined() {
            let props = Properties::from_yaml("capture:\n  console: [error, warning]\n").unwrap();
            assert_eq!(props.get("capture.console"), Some("error,warning"));
        }

        #[test]
        fn test_empty_document() {
            assert!(Properties::from_yaml("").unwrap().is_empty());
        }

        #[test]
        fn test_non_mapping_rejected() {
            assert!(Properties::from_yaml("- a\n- b\n").is_err());
        }

        #[test]
        fn test_missing_file_is_empty() {
            let dir = tempfile::tempdir().unwrap();
            let props = Properties::load(dir.path().join("absent.yaml")).unwrap();
            assert!(props.is_empty());
        }

        #[test]
        fn test_load_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("shopcheck.yaml");
            std::fs::write(&path, "site.url: https://shop.test/\n").unwrap();
            let props = Properties::load(&path).unwrap();
            assert_eq!(props.len(), 1);
        }

        #[test]
        fn test_get_parsed_error_names_key() {
            let mut props = Properties::new();
            props.set("wait.timeout_ms", "soon");
            let err = props.get_parsed::<u64>("wait.timeout_ms").unwrap_err();
            assert!(err.to_string().contains("wait.timeout_ms"));
        }
    }

    mod suite_config_tests {
        use super::*;

        #[test]
        fn test_missing_site_url_is_immediate_error() {
            let err = SuiteConfig::from_properties(&Properties::new()).unwrap_err();
            assert!(
                matches!(err, ShopcheckError::MissingProperty { ref key } if key == "site.url")
            );
        }

        #[test]
        fn test_blank_site_url_is_missing() {
            let mut props = Properties::new();
            props.set("site.url", "  ");
            assert!(matches!(
                SuiteConfig::from_properties(&props),
                Err(ShopcheckError::MissingProperty { .. })
            ));
        }

        #[test]
        fn test_defaults() {
            let config = SuiteConfig::new("https://shop.test/");
            assert_eq!(config.wait.timeout_ms, 6_000);
            assert_eq!(config.pagination.max_pages, Some(100));
            assert_eq!(config.pagination.slot_timeout_ms, 1_000);
            assert_eq!(config.pagination.assertion_mode, AssertionMode::FailFast);
            assert!(config.capture.screenshots);
            assert_eq!(config.report_dir, PathBuf::from("target/shopcheck"));
        }

        #[test]
        fn test_all_keys_applied() {
            let props = Properties::from_yaml(
                r"
site.url: https://shop.test/
browser.headless: false
browser.width: 1280
browser.height: 720
browser.executable: /usr/bin/chromium
wait.timeout_ms: 2000
wait.poll_ms: 20
pagination.max_pages: 5
pagination.deadline_ms: 60000
pagination.slot_timeout_ms: 500
pagination.mode: collect-all
capture.screenshots: false
capture.page_source: false
capture.console: error, warning
layout.product: css=div.card
report.dir: out/reports
",
            )
            .unwrap();
            let config = SuiteConfig::from_properties(&props).unwrap();
            assert!(!config.driver.headless);
            assert_eq!(config.driver.viewport_width, 1280);
            assert_eq!(config.driver.viewport_height, 720);
            assert_eq!(config.driver.executable_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.wait, WaitOptions::new().with_timeout(2000).with_poll_interval(20));
            assert_eq!(config.pagination.max_pages, Some(5));
            assert_eq!(config.pagination.deadline_ms, 60_000);
            assert_eq!(config.pagination.slot_timeout_ms, 500);
            assert_eq!(config.pagination.assertion_mode, AssertionMode::CollectAll);
            assert!(!config.capture.screenshots);
            assert!(!config.capture.page_source);
            assert_eq!(config.capture.console_levels, vec![LogLevel::Error, LogLevel::Warning]);
            assert_eq!(config.layout.product.selector, Selector::css("div.card"));
            assert_eq!(config.report_dir, PathBuf::from("out/reports"));
        }

        #[test]
        fn test_zero_max_pages_means_unbounded() {
            let mut props = Properties::new();
            props.set("site.url", "https://shop.test/");
            props.set("pagination.max_pages", "0");
            let config = SuiteConfig::from_properties(&props).unwrap();
            assert_eq!(config.pagination.max_pages, None);
        }

        #[test]
        fn test_bad_mode_rejected() {
            let mut props = Properties::new();
            props.set("site.url", "https://shop.test/");
            props.set("pagination.mode", "sometimes");
            assert!(SuiteConfig::from_properties(&props).is_err());
        }

        #[test]
        fn test_yaml_output_mentions_url() {
            let yaml = SuiteConfig::new("https://shop.test/").to_yaml().unwrap();
            assert!(yaml.contains("site_url: https://shop.test/"));
        }
    }
}
