//! BrowserDriver - Abstract Browser Automation Trait
//!
//! Page objects never talk to a concrete browser. They go through
//! [`BrowserDriver`], which has two implementations:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (Abstract Trait)                                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────┐      ┌─────────────────────────┐    │
//! │  │  ChromiumDriver         │      │  MockDriver             │    │
//! │  │  (feature = "browser")  │      │  (scripted storefront)  │    │
//! │  │  CDP via chromiumoxide  │      │  unit + scenario tests  │    │
//! │  └─────────────────────────┘      └─────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hover and click are separate primitives: category menus open on hover,
//! subcategory links navigate on click.

use crate::locator::Selector;
use crate::result::ShopcheckResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Element handle for DOM interactions
///
/// A handle is only valid for the page render it was queried from; callers
/// re-query after every navigation instead of holding handles across pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
    /// Selector the element was found with
    pub selector: Selector,
    /// Position within the query result
    pub index: usize,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, selector: Selector, index: usize) -> Self {
        Self {
            id: id.into(),
            selector,
            index,
        }
    }
}

/// Snapshot of an element's interactability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Still attached to the document
    pub exists: bool,
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
}

impl ElementState {
    /// State of an attached, visible, enabled element
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            exists: true,
            visible: true,
            enabled: true,
        }
    }

    /// State of a detached element
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            exists: false,
            visible: false,
            enabled: false,
        }
    }

    /// Check a wait condition against this state
    #[must_use]
    pub const fn satisfies(&self, condition: crate::locator::Condition) -> bool {
        use crate::locator::Condition;
        match condition {
            Condition::Exists => self.exists,
            Condition::Visible => self.exists && self.visible,
            Condition::Enabled => self.exists && self.enabled,
        }
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Browser console severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// console.debug
    Debug,
    /// console.log / console.info
    Info,
    /// console.warn
    Warning,
    /// console.error
    Error,
}

impl LogLevel {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::result::ShopcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" | "log" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" | "severe" => Ok(Self::Error),
            other => Err(crate::result::ShopcheckError::config(format!(
                "unknown log level '{other}'"
            ))),
        }
    }
}

/// One browser console message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

impl ConsoleEntry {
    /// Create a console entry
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Browser configuration for driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Extra command-line arguments
    pub args: Vec<String>,
    /// Timeout for navigation
    #[serde(with = "duration_ms")]
    pub navigation_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            executable_path: None,
            sandbox: true,
            args: vec![
                "--disable-extensions".to_string(),
                "--start-maximized".to_string(),
            ],
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn executable(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Append a browser argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Abstract driver trait for browser automation
///
/// Every call is a suspension point; the single scenario task drives one
/// driver sequentially, so implementations need no cross-call locking
/// beyond what their own backends require.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> ShopcheckResult<()>;

    /// Query all elements currently matching the selector, in document order
    async fn query_all(&self, selector: &Selector) -> ShopcheckResult<Vec<ElementHandle>>;

    /// Current existence/visibility/enabled state of an element
    async fn element_state(&self, element: &ElementHandle) -> ShopcheckResult<ElementState>;

    /// Visible text of an element
    async fn text(&self, element: &ElementHandle) -> ShopcheckResult<String>;

    /// Click element
    async fn click(&mut self, element: &ElementHandle) -> ShopcheckResult<()>;

    /// Move the pointer over an element
    async fn hover(&mut self, element: &ElementHandle) -> ShopcheckResult<()>;

    /// Take screenshot of the current viewport
    async fn screenshot(&self) -> ShopcheckResult<Screenshot>;

    /// Full page markup
    async fn page_source(&self) -> ShopcheckResult<String>;

    /// Console messages at or above `min_level` collected so far
    async fn console_logs(&self, min_level: LogLevel) -> ShopcheckResult<Vec<ConsoleEntry>>;

    /// Get current URL
    async fn current_url(&self) -> ShopcheckResult<String>;

    /// Close the browser
    async fn close(&mut self) -> ShopcheckResult<()>;
}
