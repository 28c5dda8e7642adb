//! Scripted in-memory storefront for driving page objects without a browser.
//!
//! A [`MockDriver`] holds a list of [`MockScreen`]s. Each screen is one page
//! render: a URL plus the elements it contains. Clicking an element may move
//! the driver to another screen, which is how navigation and pagination are
//! simulated. Elements can be delayed (appear after a number of queries),
//! hidden until another element is hovered, or never rendered at all.
//!
//! [`StorefrontBuilder`] assembles the screens of a whole catalog walk
//! (main page, catalog menu, listing, result pages) from a [`SiteLayout`].

use crate::driver::{BrowserDriver, ConsoleEntry, ElementHandle, ElementState, LogLevel, Screenshot};
use crate::locator::Selector;
use crate::result::{ShopcheckError, ShopcheckResult};
use crate::site::SiteLayout;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happens when an element is clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickEffect {
    /// Nothing changes
    #[default]
    Nothing,
    /// The driver moves to the screen with this index
    GoTo(usize),
    /// The element detaches (consent overlays, toasts)
    Dismiss,
}

/// One scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Selector this element answers to
    pub selector: Selector,
    /// Visible text
    pub text: String,
    /// State once rendered
    pub state: ElementState,
    /// Number of queries for the selector before the element is returned
    pub appears_after_queries: u32,
    /// Hidden until the element with this key is hovered
    pub revealed_by: Option<String>,
    /// Key other elements can reference
    pub key: Option<String>,
    /// Click behaviour
    pub on_click: ClickEffect,
}

impl MockElement {
    /// Create a rendered, visible, enabled element
    #[must_use]
    pub fn new(selector: Selector, text: impl Into<String>) -> Self {
        Self {
            selector,
            text: text.into(),
            state: ElementState::ready(),
            appears_after_queries: 0,
            revealed_by: None,
            key: None,
            on_click: ClickEffect::Nothing,
        }
    }

    /// Set click behaviour
    #[must_use]
    pub const fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = effect;
        self
    }

    /// Return the element only after `queries` lookups
    #[must_use]
    pub const fn appears_after(mut self, queries: u32) -> Self {
        self.appears_after_queries = queries;
        self
    }

    /// Override the rendered state
    #[must_use]
    pub const fn with_state(mut self, state: ElementState) -> Self {
        self.state = state;
        self
    }

    /// Found by queries but never attached to the document
    #[must_use]
    pub const fn never_rendered(mut self) -> Self {
        self.state = ElementState::detached();
        self
    }

    /// Name this element so others can be revealed by hovering it
    #[must_use]
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Keep hidden until `key` is hovered
    #[must_use]
    pub fn revealed_by(mut self, key: impl Into<String>) -> Self {
        self.revealed_by = Some(key.into());
        self
    }
}

/// One page render
#[derive(Debug, Clone)]
pub struct MockScreen {
    /// URL reported while this screen is current
    pub url: String,
    /// Elements in document order
    pub elements: Vec<MockElement>,
}

impl MockScreen {
    /// Create an empty screen
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            elements: Vec::new(),
        }
    }

    /// Add an element
    #[must_use]
    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    screens: Vec<MockScreen>,
    current: usize,
    query_counts: HashMap<(usize, Selector), u32>,
    hovered: HashSet<String>,
    dismissed: HashSet<String>,
    console: Vec<ConsoleEntry>,
    call_history: Vec<String>,
    fail_capture: bool,
    failing_query: Option<(usize, Selector)>,
    closed: bool,
}

impl MockState {
    fn parse_id(id: &str) -> Option<(usize, usize)> {
        let rest = id.strip_prefix('s')?;
        let (screen, element) = rest.split_once("-e")?;
        Some((screen.parse().ok()?, element.parse().ok()?))
    }

    fn element(&self, handle: &ElementHandle) -> ShopcheckResult<(usize, usize, &MockElement)> {
        let (screen, idx) = Self::parse_id(&handle.id)
            .ok_or_else(|| ShopcheckError::driver(format!("unknown element id {}", handle.id)))?;
        let element = self
            .screens
            .get(screen)
            .and_then(|s| s.elements.get(idx))
            .ok_or_else(|| ShopcheckError::driver(format!("unknown element id {}", handle.id)))?;
        Ok((screen, idx, element))
    }

    fn live_state(&self, handle: &ElementHandle) -> ShopcheckResult<ElementState> {
        let (screen, _, element) = self.element(handle)?;
        if screen != self.current || self.dismissed.contains(&handle.id) {
            return Ok(ElementState::detached());
        }
        let mut state = element.state;
        if let Some(ref key) = element.revealed_by {
            if !self.hovered.contains(key) {
                state.visible = false;
            }
        }
        Ok(state)
    }
}

/// Mock driver for unit and scenario testing
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver with no screens
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a screen
    #[must_use]
    pub fn with_screen(self, screen: MockScreen) -> Self {
        self.lock().screens.push(screen);
        self
    }

    /// Preload console messages
    #[must_use]
    pub fn with_console(self, entries: Vec<ConsoleEntry>) -> Self {
        self.lock().console.extend(entries);
        self
    }

    /// Make screenshot and page source capture fail
    #[must_use]
    pub fn with_failing_capture(self) -> Self {
        self.lock().fail_capture = true;
        self
    }

    /// Make every query for `selector` on `screen` fail, as a dropped
    /// connection would
    #[must_use]
    pub fn with_failing_query(self, screen: usize, selector: Selector) -> Self {
        self.lock().failing_query = Some((screen, selector));
        self
    }

    /// Index of the current screen
    #[must_use]
    pub fn current_screen(&self) -> usize {
        self.lock().current
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    /// Check if a call starting with `method` was made
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .call_history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> ShopcheckResult<()> {
        let mut state = self.lock();
        state.call_history.push(format!("navigate:{url}"));
        let target = state
            .screens
            .iter()
            .position(|s| s.url == url)
            .ok_or_else(|| ShopcheckError::Navigation {
                url: url.to_string(),
                message: "no screen serves this URL".to_string(),
            })?;
        state.current = target;
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> ShopcheckResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        state.call_history.push(format!("query:{selector}"));
        let current = state.current;
        if state.failing_query.as_ref() == Some(&(current, selector.clone())) {
            return Err(ShopcheckError::driver(format!(
                "query {selector} failed: connection closed"
            )));
        }
        let count = {
            let entry = state
                .query_counts
                .entry((current, selector.clone()))
                .or_insert(0);
            *entry += 1;
            *entry
        };
        let Some(screen) = state.screens.get(current) else {
            return Ok(Vec::new());
        };
        let handles = screen
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| &e.selector == selector && count > e.appears_after_queries)
            .map(|(idx, _)| format!("s{current}-e{idx}"))
            .filter(|id| !state.dismissed.contains(id))
            .enumerate()
            .map(|(position, id)| ElementHandle::new(id, selector.clone(), position))
            .collect();
        Ok(handles)
    }

    async fn element_state(&self, element: &ElementHandle) -> ShopcheckResult<ElementState> {
        self.lock().live_state(element)
    }

    async fn text(&self, element: &ElementHandle) -> ShopcheckResult<String> {
        let state = self.lock();
        let (_, _, mock) = state.element(element)?;
        Ok(mock.text.clone())
    }

    async fn click(&mut self, element: &ElementHandle) -> ShopcheckResult<()> {
        let mut state = self.lock();
        state.call_history.push(format!("click:{}", element.selector));
        if !state.live_state(element)?.exists {
            return Err(ShopcheckError::driver(format!(
                "cannot click detached element {}",
                element.selector
            )));
        }
        let effect = state.element(element)?.2.on_click;
        match effect {
            ClickEffect::Nothing => {}
            ClickEffect::GoTo(screen) => {
                if screen >= state.screens.len() {
                    return Err(ShopcheckError::driver(format!("no screen {screen}")));
                }
                state.current = screen;
            }
            ClickEffect::Dismiss => {
                state.dismissed.insert(element.id.clone());
            }
        }
        Ok(())
    }

    async fn hover(&mut self, element: &ElementHandle) -> ShopcheckResult<()> {
        let mut state = self.lock();
        state.call_history.push(format!("hover:{}", element.selector));
        let (_, _, mock) = state.element(element)?;
        if let Some(key) = mock.key.clone() {
            state.hovered.insert(key);
        }
        Ok(())
    }

    async fn screenshot(&self) -> ShopcheckResult<Screenshot> {
        let mut state = self.lock();
        state.call_history.push("screenshot".to_string());
        if state.fail_capture {
            return Err(ShopcheckError::capture("mock screenshot disabled"));
        }
        Ok(Screenshot::new(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]))
    }

    async fn page_source(&self) -> ShopcheckResult<String> {
        let mut state = self.lock();
        state.call_history.push("page_source".to_string());
        if state.fail_capture {
            return Err(ShopcheckError::capture("mock page source disabled"));
        }
        let screen = state
            .screens
            .get(state.current)
            .ok_or_else(|| ShopcheckError::capture("no current screen"))?;
        let mut html = format!("<html data-url=\"{}\"><body>\n", screen.url);
        for element in &screen.elements {
            html.push_str(&format!("<div title=\"{}\">{}</div>\n", element.selector, element.text));
        }
        html.push_str("</body></html>\n");
        Ok(html)
    }

    async fn console_logs(&self, min_level: LogLevel) -> ShopcheckResult<Vec<ConsoleEntry>> {
        Ok(self
            .lock()
            .console
            .iter()
            .filter(|e| e.level >= min_level)
            .cloned()
            .collect())
    }

    async fn current_url(&self) -> ShopcheckResult<String> {
        let state = self.lock();
        Ok(state
            .screens
            .get(state.current)
            .map(|s| s.url.clone())
            .unwrap_or_default())
    }

    async fn close(&mut self) -> ShopcheckResult<()> {
        let mut state = self.lock();
        state.call_history.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

// =============================================================================
// STOREFRONT FIXTURE
// =============================================================================

/// Builds a [`MockDriver`] that walks like the real storefront.
///
/// Screen layout:
///
/// | index | screen |
/// |---|---|
/// | 0 | main page |
/// | 1 | catalog menu |
/// | 2 | unfiltered listing (consent overlay, brand checkboxes) |
/// | 3.. | filtered result pages, linked by the next-page control |
#[derive(Debug, Clone)]
pub struct StorefrontBuilder {
    layout: SiteLayout,
    site_url: String,
    category: String,
    heading: String,
    brands: Vec<String>,
    unfiltered: Vec<String>,
    pages: Vec<Vec<String>>,
    stuck_after: Option<usize>,
    never_rendered_slot: Option<(usize, usize)>,
    failing_next_query: Option<usize>,
    slow_products: u32,
}

/// First filtered result page
pub const FIRST_RESULT_SCREEN: usize = 3;

impl StorefrontBuilder {
    /// Start a storefront for `category`, with the heading equal to the category
    #[must_use]
    pub fn new(site_url: impl Into<String>, category: impl Into<String>) -> Self {
        let category = category.into();
        Self {
            layout: SiteLayout::default(),
            site_url: site_url.into(),
            heading: category.clone(),
            category,
            brands: Vec::new(),
            unfiltered: Vec::new(),
            pages: Vec::new(),
            stuck_after: None,
            never_rendered_slot: None,
            failing_next_query: None,
            slow_products: 0,
        }
    }

    /// Use a custom layout
    #[must_use]
    pub fn layout(mut self, layout: SiteLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Override the rendered section heading
    #[must_use]
    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = heading.into();
        self
    }

    /// Brand checkbox labels as rendered by the site (upper case)
    #[must_use]
    pub fn brands(mut self, labels: &[&str]) -> Self {
        self.brands = labels.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Titles shown before any brand filter is applied
    #[must_use]
    pub fn unfiltered(mut self, titles: &[&str]) -> Self {
        self.unfiltered = titles.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Append a filtered result page
    #[must_use]
    pub fn page(mut self, titles: &[&str]) -> Self {
        self.pages.push(titles.iter().map(|s| (*s).to_string()).collect());
        self
    }

    /// The next-page control on page `page` (1-based) leads back to itself
    #[must_use]
    pub const fn stuck_next_on(mut self, page: usize) -> Self {
        self.stuck_after = Some(page);
        self
    }

    /// Product `slot` (0-based) on result page `page` (1-based) never renders
    #[must_use]
    pub const fn never_rendered(mut self, page: usize, slot: usize) -> Self {
        self.never_rendered_slot = Some((page, slot));
        self
    }

    /// Looking up the next-page control on page `page` (1-based) fails
    #[must_use]
    pub const fn failing_next_query_on(mut self, page: usize) -> Self {
        self.failing_next_query = Some(page);
        self
    }

    /// Products appear only after this many queries
    #[must_use]
    pub const fn slow_products(mut self, queries: u32) -> Self {
        self.slow_products = queries;
        self
    }

    /// URL of result page `page` (1-based)
    #[must_use]
    pub fn page_url(&self, page: usize) -> String {
        format!("{}/catalog/listing/?p={page}", self.site_url.trim_end_matches('/'))
    }

    fn listing_chrome(&self, mut screen: MockScreen) -> MockScreen {
        let first_result = if self.pages.is_empty() {
            2
        } else {
            FIRST_RESULT_SCREEN
        };
        screen = screen.element(MockElement::new(
            self.layout.section_heading.selector.clone(),
            self.heading.clone(),
        ));
        for brand in &self.brands {
            screen = screen.element(
                MockElement::new(self.layout.brand_checkbox.with_arg(brand).selector, brand.clone())
                    .on_click(ClickEffect::GoTo(first_result)),
            );
        }
        screen
    }

    /// Build the driver
    #[must_use]
    pub fn build(self) -> MockDriver {
        let layout = &self.layout;
        let main = MockScreen::new(self.site_url.clone()).element(
            MockElement::new(layout.catalog_button.selector.clone(), "Каталог товаров")
                .on_click(ClickEffect::GoTo(1)),
        );

        let category = layout.category_link.with_arg(&self.category).selector;
        let subcategory = layout.subcategory_link.with_arg(&self.category).selector;
        let catalog = MockScreen::new(format!("{}#catalog", self.site_url))
            .element(MockElement::new(category, self.category.clone()).keyed("category"))
            .element(
                MockElement::new(subcategory, self.category.clone())
                    .revealed_by("category")
                    .on_click(ClickEffect::GoTo(2)),
            );

        let mut unfiltered = self.listing_chrome(MockScreen::new(format!(
            "{}/catalog/listing/",
            self.site_url.trim_end_matches('/')
        )));
        unfiltered = unfiltered.element(
            MockElement::new(layout.consent_button.selector.clone(), "Я согласен")
                .on_click(ClickEffect::Dismiss),
        );
        for title in &self.unfiltered {
            unfiltered = unfiltered.element(
                MockElement::new(layout.product.selector.clone(), title.clone())
                    .appears_after(self.slow_products),
            );
        }

        let mut driver = MockDriver::new()
            .with_screen(main)
            .with_screen(catalog)
            .with_screen(unfiltered);

        let last = self.pages.len();
        for (i, titles) in self.pages.iter().enumerate() {
            let page_no = i + 1;
            let mut screen = self.listing_chrome(MockScreen::new(self.page_url(page_no)));
            for (slot, title) in titles.iter().enumerate() {
                let mut product = MockElement::new(layout.product.selector.clone(), title.clone())
                    .appears_after(self.slow_products);
                if self.never_rendered_slot == Some((page_no, slot)) {
                    product = product.never_rendered();
                }
                screen = screen.element(product);
            }
            if page_no < last {
                let target = if self.stuck_after == Some(page_no) {
                    FIRST_RESULT_SCREEN + i
                } else {
                    FIRST_RESULT_SCREEN + i + 1
                };
                screen = screen.element(
                    MockElement::new(layout.next_page.selector.clone(), "Следующая")
                        .on_click(ClickEffect::GoTo(target)),
                );
            }
            driver = driver.with_screen(screen);
        }
        if let Some(page) = self.failing_next_query {
            driver = driver.with_failing_query(
                FIRST_RESULT_SCREEN + page.saturating_sub(1),
                layout.next_page.selector.clone(),
            );
        }
        driver
    }
}
