use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A pattern violation reported by the model for one changed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    /// File path, relative to the repository root
    pub file: String,
    /// Name of the violated pattern
    pub pattern: String,
    /// What is wrong in the file
    pub issue: String,
    /// How to fix it
    pub suggested_fix: String,
}

/// Machine-readable result of one check run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub violations: Vec<Violation>,
    pub patterns_checked: usize,
    pub files_checked: usize,
    /// RFC 3339 time of the API check, absent when the check was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// Result for a run that never reached the API
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_omits_optional_fields() {
        let json = serde_json::to_string(&CheckResult::empty()).unwrap();
        assert_eq!(
            json,
            r#"{"violations":[],"patterns_checked":0,"files_checked":0}"#
        );
    }

    #[test]
    fn test_error_is_serialized_when_present() {
        let result = CheckResult {
            error: Some("boom".into()),
            ..CheckResult::empty()
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error"], "boom");
        assert!(value.get("timestamp").is_none());
    }
}
