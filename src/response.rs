use crate::types::Violation;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, trace};

const FENCE: &str = "```";

/// Errors raised while decoding the model's reply
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("unexpected code fence language '{0}', expected json")]
    FenceLanguage(String),
    #[error("code fence is not closed")]
    UnterminatedFence,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("response JSON is not an object")]
    NotAnObject,
    #[error("response does not match the violations schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Shape the model is asked to reply with
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ViolationReport {
    /// Violations found in the changed files, empty when none
    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// JSON schema of [`ViolationReport`], embedded in the prompt
pub fn report_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(ViolationReport)).unwrap_or_default()
}

/// Remove an optional code fence around the reply.
///
/// Accepted forms, after trimming surrounding whitespace:
/// - a bare body
/// - an opening fence with an empty or `json` (any case) info string,
///   a newline, the body, and a closing fence at the very end
/// - a bare body followed by a closing fence
pub fn strip_fences(text: &str) -> Result<&str, ResponseError> {
    let body = text.trim();

    let Some(rest) = body.strip_prefix(FENCE) else {
        return Ok(body.strip_suffix(FENCE).unwrap_or(body).trim());
    };

    let (info, rest) = rest
        .split_once('\n')
        .ok_or(ResponseError::UnterminatedFence)?;
    let info = info.trim();
    if !info.is_empty() && !info.eq_ignore_ascii_case("json") {
        return Err(ResponseError::FenceLanguage(info.to_string()));
    }

    rest.strip_suffix(FENCE)
        .map(str::trim)
        .ok_or(ResponseError::UnterminatedFence)
}

/// Decode the violations list from the model's reply
pub fn parse_violations(text: &str) -> Result<Vec<Violation>, ResponseError> {
    let body = strip_fences(text)?;
    trace!("Decoding response body: {}", body);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(ResponseError::InvalidJson)?;
    if !value.is_object() {
        return Err(ResponseError::NotAnObject);
    }

    let report: ViolationReport = serde_json::from_value(value).map_err(ResponseError::Schema)?;
    debug!("Decoded {} violations", report.violations.len());
    Ok(report.violations)
}
