use clap::{Parser, Subcommand};

// Display order for API key option (placed at top of help text)
const API_KEY_DISPLAY_ORDER: usize = 0;
// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "finn", version, about = "Checks pull request changes against coding patterns", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: FINN_LOG=] [default: info]
    #[arg(
        long,
        env = "FINN_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Check changed files against enforceable patterns
    Check(CheckArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Base reference to compare against.
    /// Examples: origin/main, commit hash, ^ or ~1 (relative to HEAD).
    /// ROOT for all tracked files
    #[arg(
        long,
        env = "FINN_BASE_REF",
        default_value = "origin/main",
        verbatim_doc_comment
    )]
    pub base: String,

    /// Head reference to check
    #[arg(long, env = "FINN_HEAD_REF", default_value = "HEAD")]
    pub head: String,

    /// Repository working tree
    #[arg(long, default_value = ".")]
    pub repo: String,

    /// Path to the pattern config, relative to the repository
    #[arg(long, default_value = ".finn/patterns.json")]
    pub patterns: String,

    /// Path to an optional settings file (finn.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Override settings using dot notation (e.g. llm.model=claude-opus-4-1)
    #[arg(long = "config-override")]
    pub config_overrides: Vec<String>,

    /// Completion API key; the check is skipped when unset
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, display_order = API_KEY_DISPLAY_ORDER)]
    pub api_key: Option<String>,

    /// Output path of the JSON result
    #[arg(long, default_value = "finn-results.json")]
    pub results: String,

    /// Output path of the markdown report
    #[arg(long, default_value = "finn-report.md")]
    pub report: String,

    /// Dry run: only show patterns and files without calling the API
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_defaults() {
        let cli = Cli::try_parse_from(["finn", "check", "--base", "origin/dev"]).unwrap();
        let Commands::Check(args) = cli.command;
        assert_eq!(args.base, "origin/dev");
        assert_eq!(args.patterns, ".finn/patterns.json");
        assert_eq!(args.results, "finn-results.json");
        assert_eq!(args.report, "finn-report.md");
        assert!(!args.dry_run);
    }

    #[test]
    fn test_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "finn",
            "check",
            "--config-override",
            "llm.model=a",
            "--config-override",
            "llm.timeout_secs=10",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command;
        assert_eq!(args.config_overrides, vec!["llm.model=a", "llm.timeout_secs=10"]);
    }

    #[test]
    fn test_command_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
