use crate::run::{RunReport, Skip, Status};
use crate::types::CheckResult;

const TITLE: &str = "## Finn Pattern Check";

const NEXT_STEPS: &str = "### Next steps\n\n\
1. Review each violation above.\n\
2. Apply the suggested fix, or rework the code so it follows the pattern.\n\
3. If a pattern should not be enforced here, set `cicd_enabled: false` for it in the pattern config.\n\
4. Push your changes to re-run the check.\n";

/// Render the human-readable report for a run
pub fn render_markdown(report: &RunReport) -> String {
    let result = &report.result;
    let mut output = format!("{}\n\n", TITLE);

    match &report.status {
        Status::Skipped(skip) => {
            output.push_str(&format!("ℹ️ {}\n", skip_message(skip)));
        }
        Status::Failed => {
            output.push_str("⚠️ **The pattern check could not be completed.**\n\n");
            if let Some(error) = &result.error {
                output.push_str(&format!("```\n{}\n```\n\n", error.trim()));
            }
            output.push_str("This does not block the pull request.\n");
        }
        Status::Checked if result.violations.is_empty() => {
            output.push_str("✅ **No pattern violations found**\n\n");
            push_counts(&mut output, result);
        }
        Status::Checked => {
            push_violations(&mut output, result);
        }
    }

    output
}

/// Render the machine-readable result artifact
pub fn render_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&report.result)
}

fn skip_message(skip: &Skip) -> String {
    match skip {
        Skip::NoPatterns => {
            "No patterns found with CI/CD enforcement enabled. Skipping pattern check.".into()
        }
        Skip::ConfigInvalid(error) => format!(
            "No patterns found: the pattern config could not be loaded ({}). Skipping pattern check.",
            error
        ),
        Skip::NoChangedFiles => "No changed files to check. Skipping pattern check.".into(),
        Skip::ApiKeyMissing => {
            "No API key configured. Set ANTHROPIC_API_KEY to enable the pattern check.".into()
        }
    }
}

fn push_counts(output: &mut String, result: &CheckResult) {
    output.push_str(&format!(
        "- Patterns checked: {}\n- Files checked: {}\n",
        result.patterns_checked, result.files_checked
    ));
}

fn push_violations(output: &mut String, result: &CheckResult) {
    output.push_str(&format!(
        "❌ **Found {} violation(s)**\n\n",
        result.violations.len()
    ));
    push_counts(output, result);
    output.push('\n');

    for (i, violation) in result.violations.iter().enumerate() {
        output.push_str(&format!("#### {}. `{}`\n\n", i + 1, violation.file));
        output.push_str(&format!("**Pattern:** {}\n\n", violation.pattern));
        output.push_str(&format!("**Issue:** {}\n\n", violation.issue.trim()));
        output.push_str(&format!(
            "**Suggested fix:** {}\n\n",
            violation.suggested_fix.trim()
        ));
    }

    output.push_str(NEXT_STEPS);
}
