use crate::llm::{ApiError, CompletionProvider};
use crate::pattern::{Pattern, PromptPattern};
use crate::response::{self, ResponseError};
use crate::types::Violation;
use crate::util::truncate_text_by_chars;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, trace};

/// Errors raised by a violation check
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to parse API response: {0}")]
    ResponseParse(#[from] ResponseError),
    #[error("failed to serialize request: {0}")]
    Prompt(#[source] serde_json::Error),
}

/// File content sent to the model, possibly truncated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
}

/// Read changed files from the working tree.
///
/// Files that cannot be read as UTF-8 text (deleted, binary) are skipped.
pub async fn snapshot_files(repo: &Path, files: &[String], max_chars: usize) -> Vec<FileSnapshot> {
    let mut snapshots = Vec::with_capacity(files.len());
    for path in files {
        match tokio::fs::read_to_string(repo.join(path)).await {
            Ok(content) => {
                let result = truncate_text_by_chars(&content, max_chars);
                if result.truncated {
                    debug!("Truncated {} to {} characters", path, max_chars);
                }
                snapshots.push(FileSnapshot {
                    path: path.clone(),
                    content: result.content,
                });
            }
            Err(e) => debug!("Skipping unreadable file {}: {}", path, e),
        }
    }
    snapshots
}

/// Violations found by one check and how many changed files were read
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    pub violations: Vec<Violation>,
    pub files_read: usize,
}

/// Build the single request sent to the model
pub fn build_prompt(patterns: &[Pattern], snapshots: &[FileSnapshot]) -> Result<String, CheckError> {
    let prompt_patterns: Vec<PromptPattern<'_>> = patterns.iter().map(Pattern::for_prompt).collect();
    let patterns_json = serde_json::to_string_pretty(&prompt_patterns).map_err(CheckError::Prompt)?;
    let files_json = serde_json::to_string_pretty(snapshots).map_err(CheckError::Prompt)?;
    let schema_json =
        serde_json::to_string_pretty(&response::report_schema()).map_err(CheckError::Prompt)?;

    Ok(format!(
        "You are a code reviewer enforcing a team's coding patterns. \
        Check the changed files below against each pattern and report every place \
        where a file breaks a pattern. Only report clear violations in the provided files.\n\n\
        Patterns:\n\n\
        ```json\n{}\n```\n\n\
        Changed files:\n\n\
        ```json\n{}\n```\n\n\
        Respond with ONLY a JSON object matching this schema, with no other text:\n\n\
        ```json\n{}\n```\n\n\
        If there are no violations, respond with {{\"violations\": []}}.",
        patterns_json, files_json, schema_json
    ))
}

/// Check changed files against enforceable patterns with one completion call.
///
/// No request is made when none of the files can be read.
pub async fn check_violations<P: CompletionProvider>(
    provider: &P,
    repo: &Path,
    files: &[String],
    patterns: &[Pattern],
    max_chars: usize,
) -> Result<Checked, CheckError> {
    let snapshots = snapshot_files(repo, files, max_chars).await;
    if snapshots.is_empty() {
        info!("No readable files to check, skipping API call");
        return Ok(Checked {
            violations: Vec::new(),
            files_read: 0,
        });
    }

    info!(
        "Checking {} of {} changed files against {} patterns",
        snapshots.len(),
        files.len(),
        patterns.len()
    );
    let prompt = build_prompt(patterns, &snapshots)?;
    trace!("Prompt: {}", prompt);

    let text = provider.complete(&prompt).await?;
    let violations = response::parse_violations(&text)?;
    info!("Model reported {} violations", violations.len());
    Ok(Checked {
        violations,
        files_read: snapshots.len(),
    })
}
