mod check;
mod cli;
mod config;
mod git;
mod llm;
mod pattern;
mod render;
mod response;
mod run;
mod types;
mod util;

use clap::Parser;
use cli::{CheckArgs, Cli, Commands};
use config::{RunConfig, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}': {}", cli.log_level, e);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => std::process::exit(run_check(&args).await),
    }
}

async fn run_check(args: &CheckArgs) -> i32 {
    let settings = Settings::load(args.config.as_deref(), &args.config_overrides)
        .unwrap_or_else(|e| {
            warn!("Failed to load settings, using defaults: {:#}", e);
            Settings::default()
        });
    let config = RunConfig::from_args(args, settings);

    if args.dry_run {
        match run::plan(&config) {
            Ok(plan) => {
                info!("Dry run - {} patterns:", plan.patterns.len());
                for pattern in &plan.patterns {
                    info!("  {} ({:?})", pattern.name, pattern.category);
                }
                info!("Dry run - {} files:", plan.files.len());
                for file in &plan.files {
                    info!("  {}", file);
                }
            }
            Err(skip) => info!("Dry run - check would be skipped: {:?}", skip),
        }
        return 0;
    }

    let report = run::run(&config).await;
    run::write_artifacts(&config, &report);

    let code = report.exit_code();
    if code != 0 {
        warn!(
            "{} pattern violation(s) found, see {}",
            report.result.violations.len(),
            config.report_path.display()
        );
    }
    code
}
