use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tracing::{debug, info, trace};

/// Errors raised while loading the pattern config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read pattern config {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse pattern config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Classification of a pattern as written by its author
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BestPractice,
    Neutral,
    AntiPattern,
}

/// Polarity used to decide whether a pattern may be enforced
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Quality {
    pub category: Polarity,
}

/// A named coding rule read from the pattern config
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    /// Normative rule text
    #[serde(default)]
    pub norm: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub quality: Option<Quality>,
    /// Opt-out flag; only an explicit `false` disables the pattern
    #[serde(default)]
    pub cicd_enabled: Option<bool>,
}

impl Pattern {
    /// Positive or neutral quality, and not opted out of CI/CD
    pub fn is_enforceable(&self) -> bool {
        let polarity_ok = matches!(
            self.quality.as_ref().map(|q| q.category),
            Some(Polarity::Positive | Polarity::Neutral)
        );
        polarity_ok && self.cicd_enabled != Some(false)
    }

    /// View of the pattern sent to the model, without quality or opt-out fields
    pub fn for_prompt(&self) -> PromptPattern<'_> {
        PromptPattern {
            name: &self.name,
            norm: &self.norm,
            description: &self.description,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PromptPattern<'a> {
    pub name: &'a str,
    pub norm: &'a str,
    pub description: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternFile {
    Wrapped { patterns: Vec<Pattern> },
    Bare(Vec<Pattern>),
}

/// Load patterns from a JSON file.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<Vec<Pattern>>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Pattern config {} not found", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let patterns = parse(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    info!("Loaded {} patterns from {}", patterns.len(), path.display());
    Ok(Some(patterns))
}

fn parse(content: &str) -> Result<Vec<Pattern>, serde_json::Error> {
    Ok(match serde_json::from_str(content)? {
        PatternFile::Wrapped { patterns } => patterns,
        PatternFile::Bare(patterns) => patterns,
    })
}

/// Keep only the patterns that may be checked in automation
pub fn enforceable(patterns: Vec<Pattern>) -> Vec<Pattern> {
    patterns
        .into_iter()
        .filter(|p| {
            let keep = p.is_enforceable();
            trace!("Pattern '{}' enforceable: {}", p.name, keep);
            keep
        })
        .collect()
}
