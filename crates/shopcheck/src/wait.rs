//! Wait Mechanisms
//!
//! Every interaction is preceded by an explicit wait: the [`Waiter`] polls
//! the driver until the first element matching a [`Locator`] satisfies a
//! [`Condition`], or fails with [`ShopcheckError::ElementNotFound`] once the
//! window closes. Elements are re-queried on every poll, so a handle from a
//! previous render is never reused.
//!
//! Waits are the only suspension points of a scenario.

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::{Condition, Locator};
use crate::result::{ShopcheckError, ShopcheckResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default element timeout (6 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 6_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default per-product slot timeout (1 second)
pub const DEFAULT_SLOT_TIMEOUT_MS: u64 = 1_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Timeout as duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outcome of a text wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWait {
    /// Last text read from the element
    pub text: String,
    /// Whether the predicate accepted it before the timeout
    pub matched: bool,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls a driver until element conditions hold
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Wait until the first element matching `locator` satisfies `condition`.
    ///
    /// The condition is checked at least once, even with a zero timeout.
    pub async fn until<D>(
        &self,
        driver: &D,
        locator: &Locator,
        condition: Condition,
    ) -> ShopcheckResult<ElementHandle>
    where
        D: BrowserDriver + ?Sized,
    {
        self.nth_until(driver, locator, 0, condition, self.options.timeout_ms)
            .await
    }

    /// Wait until the `index`-th match satisfies `condition` within `timeout_ms`
    pub async fn nth_until<D>(
        &self,
        driver: &D,
        locator: &Locator,
        index: usize,
        condition: Condition,
        timeout_ms: u64,
    ) -> ShopcheckResult<ElementHandle>
    where
        D: BrowserDriver + ?Sized,
    {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let mut polls = 0u32;

        loop {
            polls += 1;
            let found = driver.query_all(&locator.selector).await?;
            if let Some(handle) = found.into_iter().nth(index) {
                if driver.element_state(&handle).await?.satisfies(condition) {
                    debug!(
                        locator = %locator.description,
                        %condition,
                        polls,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "wait satisfied"
                    );
                    return Ok(handle);
                }
            }
            if start.elapsed() >= timeout {
                break;
            }
            sleep(self.options.poll_interval()).await;
        }

        Err(ShopcheckError::ElementNotFound {
            description: locator.description.clone(),
            condition: condition.as_str().to_string(),
            timeout_ms,
        })
    }

    /// Wait for the first match to become visible, then poll its text until
    /// `predicate` accepts it or the timeout elapses.
    pub async fn until_text<D, P>(
        &self,
        driver: &D,
        locator: &Locator,
        mut predicate: P,
    ) -> ShopcheckResult<TextWait>
    where
        D: BrowserDriver + ?Sized,
        P: FnMut(&str) -> bool + Send,
    {
        let start = Instant::now();
        let mut handle = self.until(driver, locator, Condition::Visible).await?;

        loop {
            let text = driver.text(&handle).await?;
            if predicate(&text) {
                return Ok(TextWait { text, matched: true });
            }
            if start.elapsed() >= self.options.timeout() {
                return Ok(TextWait {
                    text,
                    matched: false,
                });
            }
            sleep(self.options.poll_interval()).await;
            if let Some(fresh) = driver.query_all(&locator.selector).await?.into_iter().next() {
                handle = fresh;
            }
        }
    }

    /// Wait, slot by slot, for every currently matched element to exist.
    ///
    /// Slots are checked sequentially, each with its own `slot_timeout_ms`
    /// window, so the total wait grows with the number of matches. The first
    /// slot that does not exist in time is fatal. Returns the slot count.
    pub async fn each_slot_exists<D>(
        &self,
        driver: &D,
        locator: &Locator,
        slot_timeout_ms: u64,
    ) -> ShopcheckResult<usize>
    where
        D: BrowserDriver + ?Sized,
    {
        let slots = driver.query_all(&locator.selector).await?.len();
        for index in 0..slots {
            let slot = Locator::new(
                locator.selector.clone(),
                format!("{} #{}", locator.description, index + 1),
            );
            self.nth_until(driver, &slot, index, Condition::Exists, slot_timeout_ms)
                .await?;
        }
        debug!(locator = %locator.description, slots, "all slots present");
        Ok(slots)
    }
}

// =============================================================================
// DEADLINE
// =============================================================================

/// Cumulative deadline spanning many waits
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    /// Start a deadline now
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// Time spent since the deadline started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the limit has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.limit
    }

    /// Fail with [`ShopcheckError::DeadlineExceeded`] once expired
    pub fn check(&self) -> ShopcheckResult<()> {
        if self.is_expired() {
            return Err(ShopcheckError::DeadlineExceeded {
                elapsed_ms: self.elapsed().as_millis() as u64,
                deadline_ms: self.limit.as_millis() as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ElementState;
    use crate::locator::Selector;
    use crate::mock::{MockDriver, MockElement, MockScreen};

    fn product() -> Locator {
        Locator::css("div.product", "product")
    }

    fn driver_with(elements: Vec<MockElement>) -> MockDriver {
        let screen = elements
            .into_iter()
            .fold(MockScreen::new("https://shop.test/"), MockScreen::element);
        MockDriver::new().with_screen(screen)
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, 6_000);
            assert_eq!(opts.poll_interval_ms, 50);
        }

        #[test]
        fn test_builder() {
            let opts = WaitOptions::new().with_timeout(100).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_millis(100));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }
    }

    mod until_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_until_returns_immediately_when_ready() {
            let driver = driver_with(vec![MockElement::new(
                Selector::css("div.product"),
                "Apple iPhone 15",
            )]);
            let handle = Waiter::default()
                .until(&driver, &product(), Condition::Visible)
                .await
                .unwrap();
            assert_eq!(handle.index, 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_polls_for_late_element() {
            let driver = driver_with(vec![
                MockElement::new(Selector::css("div.product"), "late").appears_after(5),
            ]);
            let result = Waiter::default()
                .until(&driver, &product(), Condition::Exists)
                .await;
            assert!(result.is_ok());
            assert!(driver.call_count("query:") >= 6);
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_times_out_with_description() {
            let driver = driver_with(vec![]);
            let err = Waiter::new(WaitOptions::new().with_timeout(200))
                .until(&driver, &product(), Condition::Visible)
                .await
                .unwrap_err();
            match err {
                ShopcheckError::ElementNotFound {
                    description,
                    condition,
                    timeout_ms,
                } => {
                    assert_eq!(description, "product");
                    assert_eq!(condition, "visible");
                    assert_eq!(timeout_ms, 200);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_checks_once() {
            let driver = driver_with(vec![MockElement::new(Selector::css("div.product"), "x")]);
            let result = Waiter::new(WaitOptions::new().with_timeout(0))
                .until(&driver, &product(), Condition::Exists)
                .await;
            assert!(result.is_ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_disabled_element_fails_enabled_wait() {
            let disabled = MockElement::new(Selector::css("div.product"), "x").with_state(
                ElementState {
                    exists: true,
                    visible: true,
                    enabled: false,
                },
            );
            let driver = driver_with(vec![disabled]);
            let waiter = Waiter::new(WaitOptions::new().with_timeout(100));
            assert!(waiter.until(&driver, &product(), Condition::Visible).await.is_ok());
            assert!(waiter.until(&driver, &product(), Condition::Enabled).await.is_err());
        }
    }

    mod text_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_until_text_matches() {
            let driver = driver_with(vec![MockElement::new(
                Selector::css("div.product"),
                "  Смартфоны ",
            )]);
            let outcome = Waiter::default()
                .until_text(&driver, &product(), |t| t.trim() == "Смартфоны")
                .await
                .unwrap();
            assert!(outcome.matched);
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_text_reports_last_text() {
            let driver =
                driver_with(vec![MockElement::new(Selector::css("div.product"), "Ноутбуки")]);
            let outcome = Waiter::new(WaitOptions::new().with_timeout(100))
                .until_text(&driver, &product(), |t| t == "Смартфоны")
                .await
                .unwrap();
            assert!(!outcome.matched);
            assert_eq!(outcome.text, "Ноутбуки");
        }
    }

    mod slot_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_each_slot_exists_counts_slots() {
            let driver = driver_with(vec![
                MockElement::new(Selector::css("div.product"), "a"),
                MockElement::new(Selector::css("div.product"), "b"),
                MockElement::new(Selector::css("div.product"), "c"),
            ]);
            let slots = Waiter::default()
                .each_slot_exists(&driver, &product(), DEFAULT_SLOT_TIMEOUT_MS)
                .await
                .unwrap();
            assert_eq!(slots, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_never_rendered_slot_is_fatal() {
            let driver = driver_with(vec![
                MockElement::new(Selector::css("div.product"), "a"),
                MockElement::new(Selector::css("div.product"), "b").never_rendered(),
            ]);
            let err = Waiter::default()
                .each_slot_exists(&driver, &product(), DEFAULT_SLOT_TIMEOUT_MS)
                .await
                .unwrap_err();
            match err {
                ShopcheckError::ElementNotFound {
                    description,
                    timeout_ms,
                    ..
                } => {
                    assert_eq!(description, "product #2");
                    assert_eq!(timeout_ms, 1_000);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_slots_is_ok() {
            let driver = driver_with(vec![]);
            let slots = Waiter::default()
                .each_slot_exists(&driver, &product(), DEFAULT_SLOT_TIMEOUT_MS)
                .await
                .unwrap();
            assert_eq!(slots, 0);
        }
    }

    mod deadline_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_deadline_expires() {
            let deadline = Deadline::after(Duration::from_millis(500));
            assert!(deadline.check().is_ok());
            sleep(Duration::from_millis(600)).await;
            assert!(deadline.is_expired());
            assert!(matches!(
                deadline.check(),
                Err(ShopcheckError::DeadlineExceeded { deadline_ms: 500, .. })
            ));
        }
    }
}
