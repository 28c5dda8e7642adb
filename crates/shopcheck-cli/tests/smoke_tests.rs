//! Smoke tests for the shopcheck CLI
//!
//! These run the binary without a browser: help, case listing and
//! configuration resolution.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A shopcheck command isolated from the caller's environment
fn shopcheck(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shopcheck").expect("shopcheck binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("SHOPCHECK_CONFIG")
        .env_remove("SHOPCHECK_SITE_URL")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("cases"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir).assert().failure();
}

#[test]
fn test_run_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--collect-all"))
        .stdout(predicate::str::contains("--max-pages"))
        .stdout(predicate::str::contains("--site-url"));
}

// ============================================================================
// Cases
// ============================================================================

#[test]
fn test_default_case_listed() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .arg("cases")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Smartphone section check [Смартфоны, [Apple], iPhone]",
        ));
}

#[test]
fn test_cases_file_listed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.yaml");
    fs::write(
        &path,
        "- category: Смартфоны\n  brands: [Samsung, Xiaomi]\n  filter: Galaxy\n",
    )
    .unwrap();
    shopcheck(&dir)
        .args(["cases", "--cases", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Samsung, Xiaomi], Galaxy"));
}

#[test]
fn test_blank_filter_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.yaml");
    fs::write(&path, "- category: Смартфоны\n  filter: '  '\n").unwrap();
    shopcheck(&dir)
        .args(["cases", "--cases", path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn test_missing_cases_file_rejected() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .args(["cases", "--cases", "absent.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.yaml"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_from_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shopcheck.yaml"),
        "site:\n  url: https://www.citilink.ru\npagination:\n  max_pages: 7\n",
    )
    .unwrap();
    shopcheck(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://www.citilink.ru"))
        .stdout(predicate::str::contains("max_pages: 7"));
}

#[test]
fn test_config_site_url_from_env() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .env("SHOPCHECK_SITE_URL", "https://shop.test")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://shop.test"));
}

#[test]
fn test_missing_site_url_fails() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("site.url"));
}

#[test]
fn test_run_without_site_url_fails_before_launch() {
    let dir = TempDir::new().unwrap();
    shopcheck(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("site.url"));
}
