//! Reporter - Step Observer and Report Writer
//!
//! The scenario core never calls the reporter. It emits [`ReportEvent`]s on a
//! channel; the reporter consumes them on its own task and turns them into
//! result files:
//!
//! ```text
//! ┌──────────────┐  ReportEvent   ┌───────────────┐   write_all()
//! │   Session    │ ─────────────► │   Reporter    │ ─────────────► <uuid>-result.json
//! │ (page steps) │  mpsc channel  │ (aggregates)  │                <uuid>-attachment.png
//! └──────────────┘                └───────────────┘                report.html, junit.xml
//! ```
//!
//! A dropped or slow reporter never changes a scenario verdict.

use crate::result::{ShopcheckError, ShopcheckResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// EVENTS
// =============================================================================

/// File attached to a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime: String,
    /// File extension without the dot
    #[serde(skip)]
    pub extension: String,
    /// Content
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// File name once written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Attachment {
    /// Create an attachment
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        extension: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            extension: extension.into(),
            bytes,
            source: None,
        }
    }

    /// PNG image
    #[must_use]
    pub fn png(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, "image/png", "png", bytes)
    }

    /// HTML document
    #[must_use]
    pub fn html(name: impl Into<String>, markup: String) -> Self {
        Self::new(name, "text/html", "html", markup.into_bytes())
    }

    /// Plain text
    #[must_use]
    pub fn text(name: impl Into<String>, text: String) -> Self {
        Self::new(name, "text/plain", "txt", text.into_bytes())
    }
}

/// Step or scenario outcome carried by an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepStatus {
    /// Step began
    Started,
    /// Step completed
    Passed,
    /// Step returned an error
    Failed {
        /// Error message
        message: String,
        /// Assertion failure rather than a broken step
        assertion: bool,
    },
}

/// One step transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    /// Scenario the step belongs to
    pub scenario: String,
    /// Step name
    pub step: String,
    /// Outcome
    pub status: StepStatus,
    /// Captured artifacts (finished steps only)
    pub attachments: Vec<Attachment>,
    /// When the transition happened
    pub at: DateTime<Utc>,
}

/// Everything the core reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A scenario began
    ScenarioStarted {
        /// Scenario name
        name: String,
        /// Case parameters, in display order
        parameters: Vec<(String, String)>,
        /// Start time
        at: DateTime<Utc>,
    },
    /// A step began or finished
    Step(StepEvent),
    /// A scenario ended
    ScenarioFinished {
        /// Scenario name
        name: String,
        /// `Passed` or `Failed`
        status: StepStatus,
        /// End time
        at: DateTime<Utc>,
    },
}

impl ReportEvent {
    /// Start and finish events for a scenario that failed before a session
    /// existed, such as when no browser could be launched for it
    #[must_use]
    pub fn unstarted(
        name: impl Into<String>,
        parameters: Vec<(String, String)>,
        error: &ShopcheckError,
    ) -> [Self; 2] {
        let name = name.into();
        let at = Utc::now();
        [
            Self::ScenarioStarted {
                name: name.clone(),
                parameters,
                at,
            },
            Self::ScenarioFinished {
                name,
                status: StepStatus::Failed {
                    message: error.to_string(),
                    assertion: error.is_assertion(),
                },
                at,
            },
        ]
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Final status of a scenario or step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Completed without error
    Passed,
    /// An assertion failed
    Failed,
    /// Errored for a reason other than an assertion (timeout, driver)
    Broken,
    /// Never finished
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failed or broken
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::Broken)
    }

    fn from_outcome(status: &StepStatus) -> (Self, Option<String>) {
        match status {
            StepStatus::Started => (Self::Skipped, None),
            StepStatus::Passed => (Self::Passed, None),
            StepStatus::Failed { message, assertion } => {
                let s = if *assertion { Self::Failed } else { Self::Broken };
                (s, Some(message.clone()))
            }
        }
    }
}

/// Parameter of a scenario case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name
    pub name: String,
    /// Rendered value
    pub value: String,
}

/// Aggregated step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Final status
    pub status: TestStatus,
    /// Error message when not passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Start, epoch milliseconds
    pub start: i64,
    /// Stop, epoch milliseconds
    pub stop: i64,
    /// Captured artifacts
    pub attachments: Vec<Attachment>,
}

/// Aggregated scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRecord {
    /// Result file identifier
    pub uuid: Uuid,
    /// Scenario name
    pub name: String,
    /// Case parameters
    pub parameters: Vec<Parameter>,
    /// Final status
    pub status: TestStatus,
    /// Error message when not passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Start, epoch milliseconds
    pub start: i64,
    /// Stop, epoch milliseconds
    pub stop: i64,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
}

impl ScenarioRecord {
    /// Duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        (self.stop - self.start).max(0) as f64 / 1000.0
    }
}

// =============================================================================
// REPORTER
// =============================================================================

/// Aggregates step events into scenario records and writes reports
#[derive(Debug, Clone)]
pub struct Reporter {
    suite_name: String,
    records: Vec<ScenarioRecord>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new("shopcheck")
    }
}

impl Reporter {
    /// Create a reporter for a named suite
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            records: Vec::new(),
        }
    }

    /// Consume events until every sender is dropped
    pub async fn run(mut self, mut events: UnboundedReceiver<ReportEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        debug!(scenarios = self.records.len(), "report channel closed");
        self
    }

    /// Apply one event
    pub fn handle(&mut self, event: ReportEvent) {
        match event {
            ReportEvent::ScenarioStarted {
                name,
                parameters,
                at,
            } => {
                self.records.push(ScenarioRecord {
                    uuid: Uuid::new_v4(),
                    name,
                    parameters: parameters
                        .into_iter()
                        .map(|(name, value)| Parameter { name, value })
                        .collect(),
                    status: TestStatus::Skipped,
                    status_message: None,
                    start: at.timestamp_millis(),
                    stop: at.timestamp_millis(),
                    steps: Vec::new(),
                });
            }
            ReportEvent::Step(step) => {
                let Some(record) = self.open_record(&step.scenario) else {
                    debug!(scenario = %step.scenario, "step for unknown scenario dropped");
                    return;
                };
                let at = step.at.timestamp_millis();
                if step.status == StepStatus::Started {
                    record.steps.push(StepRecord {
                        name: step.step,
                        status: TestStatus::Skipped,
                        message: None,
                        start: at,
                        stop: at,
                        attachments: Vec::new(),
                    });
                    return;
                }
                let (status, message) = TestStatus::from_outcome(&step.status);
                let open = record
                    .steps
                    .iter()
                    .rposition(|s| s.name == step.step && s.status == TestStatus::Skipped);
                let target = if let Some(idx) = open {
                    &mut record.steps[idx]
                } else {
                    record.steps.push(StepRecord {
                        name: step.step,
                        status,
                        message: None,
                        start: at,
                        stop: at,
                        attachments: Vec::new(),
                    });
                    let last = record.steps.len() - 1;
                    &mut record.steps[last]
                };
                target.status = status;
                target.message = message;
                target.stop = at;
                target.attachments.extend(step.attachments);
            }
            ReportEvent::ScenarioFinished { name, status, at } => {
                if let Some(record) = self.open_record(&name) {
                    let (status, message) = TestStatus::from_outcome(&status);
                    record.status = status;
                    record.status_message = message;
                    record.stop = at.timestamp_millis();
                    info!(scenario = %record.name, status = ?record.status, "scenario recorded");
                }
            }
        }
    }

    fn open_record(&mut self, name: &str) -> Option<&mut ScenarioRecord> {
        self.records.iter_mut().rev().find(|r| r.name == name)
    }

    /// Scenario records in start order
    #[must_use]
    pub fn records(&self) -> &[ScenarioRecord] {
        &self.records
    }

    /// Get number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Failed or broken scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.status.is_passed())
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed",
            self.suite_name,
            self.passed_count(),
            self.total_count()
        )
    }

    /// Write result JSON, attachments, `report.html` and `junit.xml` to `dir`.
    ///
    /// Returns the paths written.
    pub fn write_all(&mut self, dir: &Path) -> ShopcheckResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        for record in &mut self.records {
            for step in &mut record.steps {
                for attachment in &mut step.attachments {
                    let file = format!("{}-attachment.{}", Uuid::new_v4(), attachment.extension);
                    let path = dir.join(&file);
                    std::fs::write(&path, &attachment.bytes)?;
                    attachment.source = Some(file);
                    written.push(path);
                }
            }
            let path = dir.join(format!("{}-result.json", record.uuid));
            std::fs::write(&path, serde_json::to_vec_pretty(record)?)?;
            written.push(path);
        }

        let html = dir.join("report.html");
        std::fs::write(&html, self.render_html())?;
        written.push(html);

        let junit = dir.join("junit.xml");
        std::fs::write(&junit, self.render_junit())?;
        written.push(junit);

        info!(dir = %dir.display(), files = written.len(), "report written");
        Ok(written)
    }

    /// Render HTML report content
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Shopcheck Report</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
        }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .scenario { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .scenario.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .scenario.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .scenario.broken { background: #fff3e0; border-left: 4px solid #ff9800; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        ol.steps li { margin: 2px 0; }
    </style>
</head>
<body>
"#,
        );

        html.push_str(&format!(
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>Results: {}/{} passed</h2>
</div>
"#,
            escape_xml(&self.suite_name),
            self.passed_count(),
            self.total_count(),
        ));

        for record in &self.records {
            let class = match record.status {
                TestStatus::Passed => "pass",
                TestStatus::Failed => "fail",
                TestStatus::Broken | TestStatus::Skipped => "broken",
            };
            let params = record
                .parameters
                .iter()
                .map(|p| format!("{}={}", p.name, p.value))
                .collect::<Vec<_>>()
                .join(", ");
            html.push_str(&format!(
                r#"<div class="scenario {class}">
    <strong>{}</strong> [{}] - {:?} ({:.2}s)
"#,
                escape_xml(&record.name),
                escape_xml(&params),
                record.status,
                record.duration_secs()
            ));
            if let Some(message) = &record.status_message {
                html.push_str(&format!(
                    "    <div class=\"error\">{}</div>\n",
                    escape_xml(message)
                ));
            }
            html.push_str("    <ol class=\"steps\">\n");
            for step in &record.steps {
                html.push_str(&format!(
                    "        <li>{} - {:?}",
                    escape_xml(&step.name),
                    step.status
                ));
                for attachment in &step.attachments {
                    if let Some(source) = &attachment.source {
                        html.push_str(&format!(
                            " <a href=\"{}\">{}</a>",
                            escape_xml(source),
                            escape_xml(&attachment.name)
                        ));
                    }
                }
                html.push_str("</li>\n");
            }
            html.push_str("    </ol>\n</div>\n");
        }

        html.push_str(
            r#"
<footer>
    <p>Generated by Shopcheck</p>
</footer>
</body>
</html>
"#,
        );

        html
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        let total_secs: f64 = self.records.iter().map(ScenarioRecord::duration_secs).sum();
        let failures = self
            .records
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
            .count();
        let errors = self
            .records
            .iter()
            .filter(|r| r.status == TestStatus::Broken)
            .count();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            failures,
            errors,
            total_secs
        ));
        xml.push('\n');

        for record in &self.records {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&record.name),
                record.duration_secs()
            ));
            xml.push('\n');

            let message = record.status_message.as_deref().unwrap_or_default();
            match record.status {
                TestStatus::Failed => {
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(message),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
                TestStatus::Broken => {
                    xml.push_str(&format!(
                        r#"    <error message="{}">{}</error>"#,
                        escape_xml(message),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
                TestStatus::Skipped => xml.push_str("    <skipped/>\n"),
                TestStatus::Passed => {}
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
