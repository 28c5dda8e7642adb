//! Chromium driver over the DevTools protocol (requires `browser` feature).
//!
//! One browser process, one page. Elements found by [`BrowserDriver::query_all`]
//! are kept in a registry keyed by handle id. Re-running a selector replaces
//! its earlier matches, and navigation or a click clears the registry, so only
//! the latest match set per selector stays pinned in the renderer.

use crate::driver::{
    BrowserDriver, ConsoleEntry, DriverConfig, ElementHandle, ElementState, LogLevel, Screenshot,
};
use crate::locator::Selector;
use crate::result::{ShopcheckError, ShopcheckResult};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::dom::{DiscardSearchResultsParams, PerformSearchParams};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, ReleaseObjectParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const STATE_FN: &str = r"function() {
    const connected = this.isConnected;
    let visible = false;
    if (connected) {
        const rect = this.getBoundingClientRect();
        const style = window.getComputedStyle(this);
        visible = rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    }
    return JSON.stringify({ exists: connected, visible: visible, enabled: !this.disabled });
}";

type ConsoleBuffer = Arc<std::sync::Mutex<Vec<ConsoleEntry>>>;

/// Live query results keyed by handle id, grouped by the selector that found them
#[derive(Debug)]
struct ElementRegistry<E> {
    entries: HashMap<String, E>,
    by_selector: HashMap<String, Vec<String>>,
    next_id: u64,
}

impl<E> ElementRegistry<E> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_selector: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register `found` as the current matches of `selector`.
    ///
    /// Returns the new handle ids and the evicted matches of the previous
    /// query for the same selector.
    fn replace(&mut self, selector: &str, found: Vec<E>) -> (Vec<String>, Vec<E>) {
        let evicted = self
            .by_selector
            .remove(selector)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect();
        let ids: Vec<String> = found
            .into_iter()
            .map(|element| {
                let id = format!("e{}", self.next_id);
                self.next_id += 1;
                self.entries.insert(id.clone(), element);
                id
            })
            .collect();
        self.by_selector.insert(selector.to_string(), ids.clone());
        (ids, evicted)
    }

    fn get(&self, id: &str) -> Option<&E> {
        self.entries.get(id)
    }

    fn clear(&mut self) -> Vec<E> {
        self.by_selector.clear();
        self.entries.drain().map(|(_, element)| element).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Chromium-backed [`BrowserDriver`]
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Browser,
    page: Page,
    elements: Mutex<ElementRegistry<Element>>,
    console: ConsoleBuffer,
    handler: JoinHandle<()>,
    console_task: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: DriverConfig) -> ShopcheckResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        for arg in &config.args {
            builder = builder.arg(arg.as_str());
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ShopcheckError::BrowserLaunch { message })?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| ShopcheckError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ShopcheckError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let console: ConsoleBuffer = Arc::default();
        let mut events = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| ShopcheckError::driver(e.to_string()))?;
        let sink = Arc::clone(&console);
        let console_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let entry = console_entry(&event);
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(entry);
            }
        });

        info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "chromium launched"
        );

        Ok(Self {
            config,
            browser,
            page,
            elements: Mutex::new(ElementRegistry::new()),
            console,
            handler,
            console_task,
        })
    }

    /// Launch configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    async fn find(&self, selector: &Selector) -> ShopcheckResult<Vec<Element>> {
        let failed = |e: CdpError| ShopcheckError::driver(format!("query {selector} failed: {e}"));
        match selector {
            Selector::Css(query) => self.page.find_elements(query.as_str()).await.map_err(failed),
            Selector::XPath(query) => {
                // Fetching the results of an empty search is a protocol error.
                if self.xpath_count(query).await.map_err(failed)? == 0 {
                    return Ok(Vec::new());
                }
                let e = match self.page.find_xpaths(query.as_str()).await {
                    Ok(found) => return Ok(found),
                    Err(e) => e,
                };
                if self.xpath_count(query).await.map_err(failed)? == 0 {
                    debug!(%selector, error = %e, "matches disappeared during query");
                    return Ok(Vec::new());
                }
                Err(failed(e))
            }
        }
    }

    async fn xpath_count(&self, query: &str) -> Result<i64, CdpError> {
        self.page.get_document().await?;
        let search = self.page.execute(PerformSearchParams::new(query)).await?.result;
        self.page
            .execute(DiscardSearchResultsParams::new(search.search_id))
            .await?;
        Ok(search.result_count)
    }

    /// Let the renderer collect elements the registry no longer references
    async fn release(&self, elements: Vec<Element>) {
        for element in elements {
            let params = ReleaseObjectParams::new(element.remote_object_id.clone());
            if let Err(e) = self.page.execute(params).await {
                debug!(error = %e, "release of element failed");
            }
        }
    }
}

fn lookup<'m>(
    elements: &'m ElementRegistry<Element>,
    handle: &ElementHandle,
) -> ShopcheckResult<&'m Element> {
    elements.get(&handle.id).ok_or_else(|| {
        ShopcheckError::driver(format!("stale element {} ({})", handle.id, handle.selector))
    })
}

fn console_entry(event: &EventConsoleApiCalled) -> ConsoleEntry {
    let level = match event.r#type {
        ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => LogLevel::Error,
        ConsoleApiCalledType::Warning => LogLevel::Warning,
        ConsoleApiCalledType::Debug => LogLevel::Debug,
        _ => LogLevel::Info,
    };
    let message = event
        .args
        .iter()
        .map(|arg| match (&arg.value, &arg.description) {
            (Some(serde_json::Value::String(s)), _) => s.clone(),
            (Some(value), _) => value.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    ConsoleEntry::new(level, message)
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> ShopcheckResult<()> {
        let evicted = self.elements.lock().await.clear();
        self.release(evicted).await;
        tokio::time::timeout(self.config.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| ShopcheckError::Navigation {
                url: url.to_string(),
                message: format!(
                    "timed out after {}ms",
                    self.config.navigation_timeout.as_millis()
                ),
            })?
            .map_err(|e| ShopcheckError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        debug!(%url, "navigated");
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> ShopcheckResult<Vec<ElementHandle>> {
        let found = self.find(selector).await?;
        let (ids, evicted) = {
            let mut elements = self.elements.lock().await;
            let replaced = elements.replace(&selector.to_string(), found);
            debug!(%selector, live = elements.len(), "query registered");
            replaced
        };
        self.release(evicted).await;
        Ok(ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| ElementHandle::new(id, selector.clone(), index))
            .collect())
    }

    async fn element_state(&self, element: &ElementHandle) -> ShopcheckResult<ElementState> {
        let elements = self.elements.lock().await;
        let el = lookup(&elements, element)?;
        // Nodes removed from the document make the protocol call fail.
        let returns = match el.call_js_fn(STATE_FN, false).await {
            Ok(returns) => returns,
            Err(e) => {
                debug!(element = %element.id, error = %e, "element treated as detached");
                return Ok(ElementState::detached());
            }
        };
        let raw = returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| ShopcheckError::driver("element state script returned nothing"))?;
        Ok(serde_json::from_str::<ElementState>(&raw)?)
    }

    async fn text(&self, element: &ElementHandle) -> ShopcheckResult<String> {
        let elements = self.elements.lock().await;
        lookup(&elements, element)?
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| ShopcheckError::driver(e.to_string()))
    }

    async fn click(&mut self, element: &ElementHandle) -> ShopcheckResult<()> {
        let evicted = {
            let mut elements = self.elements.lock().await;
            lookup(&elements, element)?
                .click()
                .await
                .map_err(|e| ShopcheckError::driver(format!("click failed: {e}")))?;
            // Any click may replace the document.
            elements.clear()
        };
        self.release(evicted).await;
        Ok(())
    }

    async fn hover(&mut self, element: &ElementHandle) -> ShopcheckResult<()> {
        let elements = self.elements.lock().await;
        lookup(&elements, element)?
            .hover()
            .await
            .map_err(|e| ShopcheckError::driver(format!("hover failed: {e}")))?;
        Ok(())
    }

    async fn screenshot(&self) -> ShopcheckResult<Screenshot> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ShopcheckError::capture(e.to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ShopcheckError::capture(e.to_string()))?;
        Ok(Screenshot::new(data))
    }

    async fn page_source(&self) -> ShopcheckResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ShopcheckError::capture(e.to_string()))
    }

    async fn console_logs(&self, min_level: LogLevel) -> ShopcheckResult<Vec<ConsoleEntry>> {
        Ok(self
            .console
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.level >= min_level)
            .cloned()
            .collect())
    }

    async fn current_url(&self) -> ShopcheckResult<String> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| ShopcheckError::driver(e.to_string()))
    }

    async fn close(&mut self) -> ShopcheckResult<()> {
        drop(self.elements.lock().await.clear());
        self.console_task.abort();
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        self.handler.abort();
        info!("chromium closed");
        Ok(())
    }
}
