use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Optional settings read from `finn.toml`
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CheckConfig {
    /// Characters of each file sent to the model
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
    /// File extensions considered for checking
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            max_file_chars: default_max_file_chars(),
            extensions: default_extensions(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}

fn default_model() -> String {
    "claude-sonnet-4-5".into()
}

fn default_max_tokens() -> u32 {
    4096
}

// A hung completion request must not stall the pipeline
fn default_timeout_secs() -> u64 {
    60
}

fn default_max_file_chars() -> usize {
    crate::util::DEFAULT_NUM_CHARS
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "py", "rb"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Settings {
    /// Load settings from an optional TOML file and apply dot-notation overrides
    pub fn load(path: Option<&str>, overrides: &[String]) -> anyhow::Result<Self> {
        let mut table = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings file {}", path))?;
                toml::from_str::<toml::Table>(&content)
                    .with_context(|| format!("failed to parse settings file {}", path))?
            }
            None => toml::Table::new(),
        };

        for item in overrides {
            apply_override(&mut table, item)?;
        }

        Settings::deserialize(toml::Value::Table(table)).context("invalid settings")
    }
}

/// Apply a `key.path=value` override. The value is parsed as a TOML value
/// when possible (numbers, booleans, arrays) and kept as a string otherwise.
fn apply_override(table: &mut toml::Table, item: &str) -> anyhow::Result<()> {
    let Some((key, raw)) = item.split_once('=') else {
        bail!("override '{}' must have the form key=value", item);
    };
    let path: Vec<&str> = key.trim().split('.').collect();
    if path.iter().any(|segment| segment.is_empty()) {
        bail!("override '{}' has an empty key segment", item);
    }

    let raw = raw.trim();
    let value = toml::from_str::<toml::Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()));
    debug!("Applying settings override {} = {:?}", key, value);

    let (last, parents) = path.split_last().context("empty override key")?;
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(t) => t,
            _ => bail!("override '{}': '{}' is not a table", item, segment),
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

/// Everything one run needs, assembled once at the entry point
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Repository working tree
    pub repo: PathBuf,
    pub patterns_path: PathBuf,
    pub base: String,
    pub head: String,
    pub api_key: Option<String>,
    pub llm: LlmConfig,
    pub check: CheckConfig,
    pub results_path: PathBuf,
    pub report_path: PathBuf,
}

impl RunConfig {
    pub fn from_args(args: &crate::cli::CheckArgs, settings: Settings) -> Self {
        let api_key = args
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Self {
            repo: PathBuf::from(&args.repo),
            patterns_path: PathBuf::from(&args.repo).join(&args.patterns),
            base: args.base.clone(),
            head: args.head.clone(),
            api_key,
            llm: settings.llm,
            check: settings.check,
            results_path: PathBuf::from(&args.results),
            report_path: PathBuf::from(&args.report),
        }
    }
}
