use crate::check::{self, CheckError};
use crate::config::RunConfig;
use crate::git::{self, Base, ExtensionFilter};
use crate::llm::{AnthropicProvider, ApiError, CompletionProvider};
use crate::pattern::{self, Pattern};
use crate::render;
use crate::types::CheckResult;
use chrono::Utc;
use tracing::{debug, error, info, warn};

const EXIT_SUCCESS: i32 = 0;
const EXIT_VIOLATIONS: i32 = 1;

/// Why a run stopped before calling the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    ConfigInvalid(String),
    NoPatterns,
    NoChangedFiles,
    ApiKeyMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Checked,
    Skipped(Skip),
    /// The API call or its response failed; details are in `CheckResult::error`
    Failed,
}

/// Outcome of a run; both artifacts are rendered from `result`
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: CheckResult,
    pub status: Status,
}

impl RunReport {
    fn skipped(skip: Skip) -> Self {
        Self {
            result: CheckResult::empty(),
            status: Status::Skipped(skip),
        }
    }

    /// Only violations fail the run
    pub fn exit_code(&self) -> i32 {
        if self.result.violations.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_VIOLATIONS
        }
    }
}

/// Enforceable patterns and the change set to check them against
#[derive(Debug)]
pub struct Plan {
    pub patterns: Vec<Pattern>,
    pub files: Vec<String>,
}

/// Load patterns and resolve the change set
pub fn plan(config: &RunConfig) -> Result<Plan, Skip> {
    let patterns = match pattern::load(&config.patterns_path) {
        Ok(Some(patterns)) => pattern::enforceable(patterns),
        Ok(None) => {
            info!(
                "No pattern config at {}, skipping check",
                config.patterns_path.display()
            );
            return Err(Skip::NoPatterns);
        }
        Err(e) => {
            warn!("{}, skipping check", e);
            return Err(Skip::ConfigInvalid(e.to_string()));
        }
    };
    if patterns.is_empty() {
        info!("No patterns with CI/CD enforcement enabled, skipping check");
        return Err(Skip::NoPatterns);
    }
    info!("{} enforceable patterns", patterns.len());

    let files = resolve_changed_files(config);
    if files.is_empty() {
        info!("No changed files to check");
        return Err(Skip::NoChangedFiles);
    }
    info!("Found {} changed files", files.len());
    debug!("Changed files: {:?}", files);

    Ok(Plan { patterns, files })
}

/// Resolve the change set, degrading any failure to an empty set
fn resolve_changed_files(config: &RunConfig) -> Vec<String> {
    let filter = match ExtensionFilter::new(&config.check.extensions) {
        Ok(filter) => filter,
        Err(e) => {
            warn!("Invalid extension list {:?}: {}", config.check.extensions, e);
            return Vec::new();
        }
    };

    let base = Base::parse(&config.base);
    debug!("Resolved base: {:?}, head: {}", base, config.head);
    match git::changed_files(&config.repo, &base, &config.head, &filter) {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not resolve changed files: {}", e);
            Vec::new()
        }
    }
}

/// Run the pattern check against the Anthropic API
pub async fn run(config: &RunConfig) -> RunReport {
    run_with(config, |api_key| AnthropicProvider::new(api_key, &config.llm)).await
}

/// Run the pattern check with a caller-supplied provider constructor.
///
/// Never fails: every error is folded into the returned report.
pub async fn run_with<P, F>(config: &RunConfig, connect: F) -> RunReport
where
    P: CompletionProvider,
    F: FnOnce(&str) -> Result<P, ApiError>,
{
    let plan = match plan(config) {
        Ok(plan) => plan,
        Err(skip) => return RunReport::skipped(skip),
    };

    let Some(api_key) = config.api_key.as_deref() else {
        warn!("No API key configured, skipping pattern check");
        return RunReport::skipped(Skip::ApiKeyMissing);
    };

    let mut result = CheckResult {
        patterns_checked: plan.patterns.len(),
        files_checked: plan.files.len(),
        timestamp: Some(Utc::now().to_rfc3339()),
        ..CheckResult::empty()
    };

    let outcome = match connect(api_key) {
        Ok(provider) => {
            check::check_violations(
                &provider,
                &config.repo,
                &plan.files,
                &plan.patterns,
                config.check.max_file_chars,
            )
            .await
        }
        Err(e) => Err(CheckError::from(e)),
    };

    match outcome {
        Ok(checked) => {
            info!(
                "Read {} of {} changed files",
                checked.files_read, result.files_checked
            );
            result.violations = checked.violations;
            RunReport {
                result,
                status: Status::Checked,
            }
        }
        Err(e) => {
            error!("Pattern check failed: {}", e);
            result.error = Some(e.to_string());
            RunReport {
                result,
                status: Status::Failed,
            }
        }
    }
}

/// Write the JSON result and markdown report.
///
/// Failures are logged; they never change the exit code.
pub fn write_artifacts(config: &RunConfig, report: &RunReport) {
    match render::render_json(report) {
        Ok(json) => write_file(&config.results_path, &json, "results"),
        Err(e) => error!("Failed to serialize results: {}", e),
    }
    write_file(
        &config.report_path,
        &render::render_markdown(report),
        "report",
    );
}

fn write_file(path: &std::path::Path, content: &str, kind: &str) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("Failed to create directory for {} file: {}", kind, e);
            return;
        }
    }
    match std::fs::write(path, content) {
        Ok(()) => info!("{} written to {}", kind, path.display()),
        Err(e) => error!("Failed to write {} file {}: {}", kind, path.display(), e),
    }
}
