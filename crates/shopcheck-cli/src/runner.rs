//! Suite runner: resolve configuration, run each case on a fresh browser,
//! collect step events and write the reports.

use crate::commands::{RunArgs, SourceArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use shopcheck::{
    default_cases, load_cases, run_case, AssertionMode, BrowserDriver, DriverConfig, Properties,
    ReportEvent, Reporter, ScenarioCase, Session, ShopcheckResult, SuiteConfig, SITE_URL_KEY,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Suite name used in reports
pub const SUITE_NAME: &str = "shopcheck";

/// Read the properties file and apply command-line overrides
pub fn resolve_suite(config: &CliConfig, source: &SourceArgs) -> CliResult<SuiteConfig> {
    let path = source.config.as_deref().unwrap_or(&config.config_path);
    let mut props = Properties::load(path)?;
    if let Some(ref url) = source.site_url {
        props.set(SITE_URL_KEY, url.as_str());
    }
    Ok(SuiteConfig::from_properties(&props)?)
}

/// Apply `run` flags on top of the resolved suite
pub fn apply_run_flags(suite: &mut SuiteConfig, args: &RunArgs) {
    if let Some(max_pages) = args.max_pages {
        suite.pagination.max_pages = (max_pages > 0).then_some(max_pages);
    }
    if args.collect_all {
        suite.pagination.assertion_mode = AssertionMode::CollectAll;
    }
    if args.headed {
        suite.driver.headless = false;
    }
    if let Some(ref dir) = args.report_dir {
        suite.report_dir.clone_from(dir);
    }
}

/// Cases from `path`, or the default smartphones case
pub fn resolve_cases(path: Option<&Path>) -> CliResult<Vec<ScenarioCase>> {
    let cases = match path {
        Some(path) if !path.is_file() => {
            return Err(CliError::invalid_argument(format!(
                "cases file {} not found",
                path.display()
            )));
        }
        Some(path) => load_cases(path)?,
        None => default_cases()?,
    };
    Ok(cases)
}

/// Outcome of a suite run
#[derive(Debug)]
pub struct SuiteOutcome {
    /// Aggregated scenario records
    pub reporter: Reporter,
    /// Report files written
    pub written: Vec<PathBuf>,
}

/// Runs scenario cases one browser per case
#[derive(Debug)]
pub struct SuiteRunner {
    suite: SuiteConfig,
    progress: ProgressReporter,
}

impl SuiteRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: &CliConfig, suite: SuiteConfig) -> Self {
        Self {
            suite,
            progress: ProgressReporter::new(
                config.color.should_color(),
                config.verbosity.is_quiet(),
            ),
        }
    }

    /// Run every case, launching a driver per case with `launch`.
    ///
    /// A case whose browser fails to launch is recorded as broken and the
    /// suite moves on. Reports are written even when cases fail; the returned
    /// error then carries the failure count.
    pub async fn run<D, F, Fut>(
        &mut self,
        cases: &[ScenarioCase],
        mut launch: F,
    ) -> CliResult<SuiteOutcome>
    where
        D: BrowserDriver,
        F: FnMut(DriverConfig) -> Fut,
        Fut: Future<Output = ShopcheckResult<D>>,
    {
        let started = Instant::now();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let collector = tokio::spawn(Reporter::new(SUITE_NAME).run(rx));

        self.progress.start_progress(cases.len() as u64, "cases");
        for case in cases {
            let name = case.display_name();
            self.progress.set_message(&name);
            info!(case = %name, site = %self.suite.site_url, "running case");

            let driver = match launch(self.suite.driver.clone()).await {
                Ok(driver) => driver,
                Err(e) => {
                    warn!(case = %name, error = %e, "browser launch failed");
                    self.progress.failure(&format!("{name}: {e}"));
                    for event in ReportEvent::unstarted(name, case.parameters(), &e) {
                        let _ = tx.send(event);
                    }
                    self.progress.increment();
                    continue;
                }
            };
            let mut session = Session::new(driver, self.suite.clone()).with_observer(tx.clone());
            match run_case(&mut session, case).await {
                Ok(report) => self.progress.success(&format!(
                    "{name}: {} page(s), {} product(s)",
                    report.pages, report.products_checked
                )),
                Err(e) => self.progress.failure(&format!("{name}: {e}")),
            }
            if let Err(e) = session.close().await {
                warn!(error = %e, "driver close failed");
            }
            self.progress.increment();
        }
        self.progress.finish();
        drop(tx);

        let mut reporter = collector
            .await
            .map_err(|e| CliError::config(format!("report collector stopped: {e}")))?;
        let written = reporter.write_all(&self.suite.report_dir)?;
        info!(
            dir = %self.suite.report_dir.display(),
            files = written.len(),
            "reports written"
        );
        self.progress.info(&format!(
            "{} report file(s) in {}",
            written.len(),
            self.suite.report_dir.display()
        ));

        let failed = reporter.failed_count();
        self.progress
            .summary(reporter.passed_count(), failed, started.elapsed());
        if failed > 0 {
            return Err(CliError::CasesFailed {
                failed,
                total: reporter.total_count(),
            });
        }
        Ok(SuiteOutcome { reporter, written })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::{ColorChoice, Verbosity};
    use shopcheck::{MockDriver, ShopcheckError, StorefrontBuilder, WaitOptions};

    const SITE: &str = "https://www.citilink.ru";

    fn cli_config() -> CliConfig {
        CliConfig::new()
            .with_verbosity(Verbosity::Quiet)
            .with_color(ColorChoice::Never)
    }

    fn suite(dir: &Path) -> SuiteConfig {
        let mut suite = SuiteConfig::new(SITE);
        suite.wait = WaitOptions::new().with_timeout(200);
        suite.report_dir = dir.to_path_buf();
        suite
    }

    fn storefront(pages: &[&[&str]]) -> MockDriver {
        let mut builder = StorefrontBuilder::new(SITE, "Смартфоны").brands(&["APPLE"]);
        for page in pages {
            builder = builder.page(page);
        }
        builder.build()
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_site_url_flag_overrides_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("shopcheck.yaml");
            std::fs::write(&path, "site:\n  url: https://a.test\nwait:\n  timeout_ms: 100\n")
                .unwrap();
            let source = SourceArgs {
                config: Some(path),
                site_url: Some("https://b.test".to_string()),
            };
            let suite = resolve_suite(&cli_config(), &source).unwrap();
            assert_eq!(suite.site_url, "https://b.test");
            assert_eq!(suite.wait.timeout_ms, 100);
        }

        #[test]
        fn test_missing_site_url() {
            let dir = tempfile::tempdir().unwrap();
            let source = SourceArgs {
                config: Some(dir.path().join("absent.yaml")),
                site_url: None,
            };
            let err = resolve_suite(&cli_config(), &source).unwrap_err();
            assert!(matches!(
                err,
                CliError::Shopcheck(ShopcheckError::MissingProperty { .. })
            ));
        }

        #[test]
        fn test_run_flags() {
            let mut suite = SuiteConfig::new(SITE);
            let args = RunArgs {
                source: SourceArgs::default(),
                cases: None,
                max_pages: Some(0),
                collect_all: true,
                headed: true,
                report_dir: Some(PathBuf::from("out")),
            };
            apply_run_flags(&mut suite, &args);
            assert_eq!(suite.pagination.max_pages, None);
            assert_eq!(suite.pagination.assertion_mode, AssertionMode::CollectAll);
            assert!(!suite.driver.headless);
            assert_eq!(suite.report_dir, PathBuf::from("out"));
        }

        #[test]
        fn test_default_cases() {
            let cases = resolve_cases(None).unwrap();
            assert_eq!(cases.len(), 1);
            assert_eq!(cases[0].filter.as_str(), "iPhone");
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_passing_suite_writes_reports() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = SuiteRunner::new(&cli_config(), suite(dir.path()));
            let cases = resolve_cases(None).unwrap();
            let outcome = runner
                .run(&cases, |_| async {
                    Ok(storefront(&[&["Apple iPhone 15"], &["Apple iPhone 14"]]))
                })
                .await
                .unwrap();
            assert!(outcome.reporter.all_passed());
            assert!(dir.path().join("junit.xml").exists());
            assert!(!outcome.written.is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_failing_case_still_writes_reports() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = SuiteRunner::new(&cli_config(), suite(dir.path()));
            let cases = resolve_cases(None).unwrap();
            let err = runner
                .run(&cases, |_| async { Ok(storefront(&[&["Apple Watch"]])) })
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::CasesFailed { failed: 1, total: 1 }));
            assert!(dir.path().join("report.html").exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_launch_failure_is_broken_case() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = SuiteRunner::new(&cli_config(), suite(dir.path()));
            let cases = resolve_cases(None).unwrap();
            let err = runner
                .run(&cases, |_| async {
                    Err::<MockDriver, _>(ShopcheckError::BrowserLaunch {
                        message: "no chromium".to_string(),
                    })
                })
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::CasesFailed { failed: 1, total: 1 }));
            let junit = std::fs::read_to_string(dir.path().join("junit.xml")).unwrap();
            assert!(junit.contains("no chromium"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_later_launch_failure_keeps_earlier_reports() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = SuiteRunner::new(&cli_config(), suite(dir.path()));
            let mut cases = resolve_cases(None).unwrap();
            cases.push(cases[0].clone());
            let mut launches = 0;
            let err = runner
                .run(&cases, |_| {
                    launches += 1;
                    let first = launches == 1;
                    async move {
                        if first {
                            Ok(storefront(&[&["Apple iPhone 15"]]))
                        } else {
                            Err(ShopcheckError::BrowserLaunch {
                                message: "crashed".to_string(),
                            })
                        }
                    }
                })
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::CasesFailed { failed: 1, total: 2 }));
            assert!(dir.path().join("junit.xml").exists());
            assert!(dir.path().join("report.html").exists());
        }

        #[test]
        fn test_missing_cases_file_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let err = resolve_cases(Some(dir.path().join("absent.yaml").as_path())).unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
            assert!(err.to_string().contains("absent.yaml"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_each_case_gets_the_suite_driver_config() {
            let dir = tempfile::tempdir().unwrap();
            let mut suite = suite(dir.path());
            suite.driver.headless = false;
            let mut runner = SuiteRunner::new(&cli_config(), suite);
            let cases = resolve_cases(None).unwrap();
            let mut seen = Vec::new();
            runner
                .run(&cases, |config| {
                    seen.push(config.headless);
                    async { Ok(storefront(&[&["Apple iPhone 15"]])) }
                })
                .await
                .unwrap();
            assert_eq!(seen, vec![false]);
        }
    }
}
