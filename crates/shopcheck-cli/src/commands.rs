//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shopcheck: browser checks for paginated storefront catalogs
#[derive(Parser, Debug)]
#[command(name = "shopcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenario cases in Chromium
    Run(RunArgs),

    /// List the cases that would run
    Cases(CasesArgs),

    /// Print the resolved configuration
    Config(ConfigArgs),
}

/// Properties file and site overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Properties file (YAML)
    #[arg(short, long, env = "SHOPCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storefront URL, overriding `site.url`
    #[arg(long, env = "SHOPCHECK_SITE_URL")]
    pub site_url: Option<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration sources
    #[command(flatten)]
    pub source: SourceArgs,

    /// Cases file (YAML list); defaults to the smartphones case
    #[arg(long)]
    pub cases: Option<PathBuf>,

    /// Page cap for the pagination loop (0 = unbounded)
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Visit every page and report all mismatches instead of stopping at the first
    #[arg(long)]
    pub collect_all: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub report_dir: Option<PathBuf>,
}

/// Arguments for the cases command
#[derive(Parser, Debug)]
pub struct CasesArgs {
    /// Cases file (YAML list); defaults to the smartphones case
    #[arg(long)]
    pub cases: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration sources
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::try_parse_from(["shopcheck", "run"]).unwrap();
            assert_eq!(cli.verbose, 0);
            assert!(!cli.quiet);
            match cli.command {
                Commands::Run(args) => {
                    assert!(args.cases.is_none());
                    assert!(args.max_pages.is_none());
                    assert!(!args.collect_all);
                    assert!(!args.headed);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_parse_run_flags() {
            let cli = Cli::try_parse_from([
                "shopcheck",
                "-vv",
                "run",
                "--site-url",
                "https://shop.test",
                "--max-pages",
                "5",
                "--collect-all",
                "--headed",
                "--report-dir",
                "out",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            match cli.command {
                Commands::Run(args) => {
                    assert_eq!(args.source.site_url.as_deref(), Some("https://shop.test"));
                    assert_eq!(args.max_pages, Some(5));
                    assert!(args.collect_all);
                    assert!(args.headed);
                    assert_eq!(args.report_dir, Some(PathBuf::from("out")));
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_parse_config_with_file() {
            let cli =
                Cli::try_parse_from(["shopcheck", "config", "-c", "ci.yaml", "--color", "never"])
                    .unwrap();
            assert!(matches!(cli.color, ColorArg::Never));
            match cli.command {
                Commands::Config(args) => {
                    assert_eq!(args.source.config, Some(PathBuf::from("ci.yaml")));
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["shopcheck"]).is_err());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_color_arg_conversion() {
            let auto: ColorChoice = ColorArg::Auto.into();
            assert!(matches!(auto, ColorChoice::Auto));
            let never: ColorChoice = ColorArg::Never.into();
            assert!(matches!(never, ColorChoice::Never));
        }
    }
}
