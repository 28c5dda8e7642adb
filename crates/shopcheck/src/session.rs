//! Browser session: the single driver a scenario runs on.
//!
//! A [`Session`] exclusively owns its driver and configuration. Page objects
//! borrow it mutably, one at a time, so there is never concurrent access to
//! the browser.
//!
//! Named steps are bracketed by [`Session::begin_step`] and
//! [`Session::finish_step`]. When an observer is attached, each finished step
//! captures a screenshot, the page source and console logs, and emits a
//! [`ReportEvent`]. Capture failures are logged and skipped.

use crate::config::SuiteConfig;
use crate::driver::{BrowserDriver, LogLevel};
use crate::reporter::{Attachment, ReportEvent, StepEvent, StepStatus};
use crate::result::ShopcheckResult;
use crate::site::SiteLayout;
use crate::wait::Waiter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Artifacts captured when a step finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Attach a PNG of the viewport
    pub screenshots: bool,
    /// Attach the page markup
    pub page_source: bool,
    /// Attach console messages, one attachment per level listed
    pub console_levels: Vec<LogLevel>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            screenshots: true,
            page_source: true,
            console_levels: Vec::new(),
        }
    }
}

impl CaptureOptions {
    /// Capture nothing
    #[must_use]
    pub const fn none() -> Self {
        Self {
            screenshots: false,
            page_source: false,
            console_levels: Vec::new(),
        }
    }
}

/// A step in progress
#[derive(Debug)]
#[must_use = "a step must be finished with Session::finish_step"]
pub struct Step {
    name: String,
}

impl Step {
    /// Step name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One scenario's browser session
#[derive(Debug)]
pub struct Session<D: BrowserDriver> {
    driver: D,
    config: SuiteConfig,
    waiter: Waiter,
    scenario: String,
    events: Option<UnboundedSender<ReportEvent>>,
}

impl<D: BrowserDriver> Session<D> {
    /// Create a session over `driver`
    #[must_use]
    pub fn new(driver: D, config: SuiteConfig) -> Self {
        let waiter = Waiter::new(config.wait);
        Self {
            driver,
            config,
            waiter,
            scenario: String::from("scenario"),
            events: None,
        }
    }

    /// Attach a step observer
    #[must_use]
    pub fn with_observer(mut self, events: UnboundedSender<ReportEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Storefront locators
    #[must_use]
    pub const fn layout(&self) -> &SiteLayout {
        &self.config.layout
    }

    /// Waiter built from the configured wait options
    #[must_use]
    pub const fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    /// Current scenario name
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Close the browser and give the driver back
    pub async fn close(mut self) -> ShopcheckResult<D> {
        self.driver.close().await?;
        Ok(self.driver)
    }

    /// Start a scenario and report its parameters
    pub fn start_scenario(&mut self, name: impl Into<String>, parameters: Vec<(String, String)>) {
        self.scenario = name.into();
        info!(scenario = %self.scenario, "scenario started");
        self.emit(ReportEvent::ScenarioStarted {
            name: self.scenario.clone(),
            parameters,
            at: Utc::now(),
        });
    }

    /// Report the scenario verdict
    pub fn finish_scenario<T>(&mut self, result: &ShopcheckResult<T>) {
        let status = outcome(result);
        match &status {
            StepStatus::Failed { message, .. } => {
                warn!(scenario = %self.scenario, error = %message, "scenario failed");
            }
            _ => info!(scenario = %self.scenario, "scenario passed"),
        }
        self.emit(ReportEvent::ScenarioFinished {
            name: self.scenario.clone(),
            status,
            at: Utc::now(),
        });
    }

    /// Open a named step
    pub fn begin_step(&mut self, name: impl Into<String>) -> Step {
        let name = name.into();
        debug!(scenario = %self.scenario, step = %name, "step started");
        self.emit_step(&name, StepStatus::Started, Vec::new());
        Step { name }
    }

    /// Close a step with its result, capturing attachments, and pass the
    /// result through unchanged.
    pub async fn finish_step<T>(
        &mut self,
        step: Step,
        result: ShopcheckResult<T>,
    ) -> ShopcheckResult<T> {
        let status = outcome(&result);
        if let StepStatus::Failed { message, .. } = &status {
            warn!(scenario = %self.scenario, step = %step.name, error = %message, "step failed");
        } else {
            debug!(scenario = %self.scenario, step = %step.name, "step passed");
        }
        let attachments = if self.events.is_some() {
            self.capture().await
        } else {
            Vec::new()
        };
        self.emit_step(&step.name, status, attachments);
        result
    }

    /// Capture the configured artifacts. Failures are logged and skipped.
    pub async fn capture(&self) -> Vec<Attachment> {
        let options = &self.config.capture;
        let mut attachments = Vec::new();

        if options.screenshots {
            match self.driver.screenshot().await {
                Ok(shot) if shot.is_valid() => {
                    attachments.push(Attachment::png("Screenshot", shot.data));
                }
                Ok(_) => warn!("empty screenshot skipped"),
                Err(e) => warn!(error = %e, "screenshot capture failed"),
            }
        }

        if options.page_source {
            match self.driver.page_source().await {
                Ok(markup) => attachments.push(Attachment::html("Page source", markup)),
                Err(e) => warn!(error = %e, "page source capture failed"),
            }
        }

        if !options.console_levels.is_empty() {
            match self.driver.console_logs(LogLevel::Debug).await {
                Ok(entries) => {
                    for level in &options.console_levels {
                        let lines: Vec<String> = entries
                            .iter()
                            .filter(|e| e.level == *level)
                            .map(|e| format!("[{}] {}", e.level.as_str(), e.message))
                            .collect();
                        if !lines.is_empty() {
                            attachments.push(Attachment::text(
                                format!("Console: {}", level.as_str()),
                                lines.join("\n"),
                            ));
                        }
                    }
                }
                Err(e) => warn!(error = %e, "console log capture failed"),
            }
        }

        attachments
    }

    fn emit_step(&self, step: &str, status: StepStatus, attachments: Vec<Attachment>) {
        self.emit(ReportEvent::Step(StepEvent {
            scenario: self.scenario.clone(),
            step: step.to_string(),
            status,
            attachments,
            at: Utc::now(),
        }));
    }

    fn emit(&self, event: ReportEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                debug!("report observer gone, event dropped");
            }
        }
    }
}

fn outcome<T>(result: &ShopcheckResult<T>) -> StepStatus {
    match result {
        Ok(_) => StepStatus::Passed,
        Err(e) => StepStatus::Failed {
            message: e.to_string(),
            assertion: e.is_assertion(),
        },
    }
}
