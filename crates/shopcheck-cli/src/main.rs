//! Shopcheck CLI: run storefront catalog checks
//!
//! ## Usage
//!
//! ```bash
//! shopcheck run --site-url https://www.citilink.ru   # Run the default case
//! shopcheck run --cases cases.yaml --collect-all     # Run a case list
//! shopcheck cases --cases cases.yaml                 # List cases
//! shopcheck config -c shopcheck.yaml                 # Print resolved config
//! ```

use clap::Parser;
#[cfg(feature = "browser")]
use shopcheck_cli::apply_run_flags;
use shopcheck_cli::{
    resolve_cases, resolve_suite, CasesArgs, Cli, CliConfig, CliResult,
    Commands, ConfigArgs, RunArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.init_logging();

    match cli.command {
        Commands::Run(args) => run_suite(&config, &args),
        Commands::Cases(args) => run_cases(&args),
        Commands::Config(args) => run_config(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.into())
}

#[cfg(feature = "browser")]
fn run_suite(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    use shopcheck::ChromiumDriver;
    use shopcheck_cli::SuiteRunner;

    let mut suite = resolve_suite(config, &args.source)?;
    apply_run_flags(&mut suite, args);
    let cases = resolve_cases(args.cases.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut runner = SuiteRunner::new(config, suite);
        runner.run(&cases, ChromiumDriver::launch).await?;
        Ok(())
    })
}

#[cfg(not(feature = "browser"))]
fn run_suite(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    resolve_suite(config, &args.source)?;
    resolve_cases(args.cases.as_deref())?;
    Err(shopcheck_cli::CliError::BrowserUnavailable)
}

fn run_cases(args: &CasesArgs) -> CliResult<()> {
    for case in resolve_cases(args.cases.as_deref())? {
        println!("{}", case.display_name());
    }
    Ok(())
}

fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let suite = resolve_suite(config, &args.source)?;
    print!("{}", suite.to_yaml()?);
    Ok(())
}
