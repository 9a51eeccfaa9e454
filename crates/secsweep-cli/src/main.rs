mod display;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use secsweep_core::config::{self, FileConfig, RunConfig};
use secsweep_core::{discovery, suite};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "secsweep",
    version,
    about = "SecSweep — security scan orchestrator",
    long_about = "Discover the security scanners installed on this machine, run them against \
a project in parallel, and aggregate the outcomes into one text/JSON report."
)]
struct Cli {
    /// Project directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Core vulnerability scans only (skips secret scan and license check)
    #[arg(long)]
    quick: bool,

    /// Apply auto-remediation where a tool supports it
    #[arg(long)]
    fix: bool,

    /// Print installation guidance for missing tools
    #[arg(long)]
    install: bool,

    /// Non-interactive CI mode: no color, JSON report always written
    #[arg(long)]
    ci: bool,

    /// Verbose diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Skip the Snyk test even when the tool is installed
    #[arg(long)]
    skip_snyk: bool,

    /// Bypass the tool-discovery cache
    #[arg(long)]
    skip_cache: bool,

    /// Sequential mode only: stop launching tests after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Write a JSON report next to the text report
    #[arg(long)]
    json: bool,

    /// Run tests one at a time instead of in parallel
    #[arg(long)]
    no_parallel: bool,

    /// Maximum number of concurrent scanner processes
    #[arg(long, value_name = "N")]
    max_parallel: Option<usize>,

    /// Per-test timeout in seconds
    #[arg(long, value_name = "N")]
    timeout: Option<u64>,

    /// Directory for reports and per-test logs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version are not usage errors; everything else is
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);
    if cli.ci {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display::print_fatal(&e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let file = FileConfig::load(&cli.path)
        .with_context(|| format!("loading {} from {}", config::CONFIG_FILE, cli.path.display()))?;
    let run_config = build_config(cli, file);

    display::print_header(&run_config);

    let inventory = discovery::discover(&run_config);
    display::print_inventory(&inventory, &run_config);

    if run_config.fail_fast && run_config.parallel {
        display::print_warning("--fail-fast only applies to sequential runs; add --no-parallel");
    }

    let outcome = suite::run_with_inventory(&run_config, inventory).await?;
    display::print_results(&outcome.results);
    display::print_summary(&outcome);

    Ok(outcome.exit_code())
}

/// Assemble the immutable run configuration: defaults, then `secsweep.toml`,
/// then CLI flags and environment on top.
fn build_config(cli: Cli, file: FileConfig) -> RunConfig {
    RunConfig {
        output_dir: cli
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_OUTPUT_DIR)),
        quick: cli.quick || file.quick.unwrap_or(false),
        fix: cli.fix,
        install: cli.install,
        ci: cli.ci,
        verbose: cli.verbose,
        skip_snyk: cli.skip_snyk || file.skip_snyk.unwrap_or(false),
        skip_cache: cli.skip_cache || config::env_flag(config::NO_CACHE_ENV),
        fail_fast: cli.fail_fast,
        json: cli.json || cli.ci,
        parallel: !cli.no_parallel,
        max_parallel: cli
            .max_parallel
            .or(file.max_parallel)
            .unwrap_or(config::DEFAULT_MAX_PARALLEL)
            .max(1),
        timeout: Duration::from_secs(
            cli.timeout
                .or(file.timeout_secs)
                .unwrap_or(config::DEFAULT_TIMEOUT_SECS),
        ),
        snyk_token: std::env::var(config::SNYK_TOKEN_ENV).ok(),
        project_root: cli.path,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {} {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
    if let Err(e) = result {
        eprintln!("could not initialize logging: {e}");
    }
}
