use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use tracing::{debug, trace};

/// Errors raised by git invocations
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("failed to execute git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Represents the base reference for git operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base {
    /// Check every tracked file in the repository
    Root,
    /// Check changes since a specific commit
    Commit(String),
}

impl Base {
    /// Parse a base string into a Base enum
    ///
    /// - "ROOT": all tracked files
    /// - "^" or "~": relative to HEAD
    /// - Otherwise: commit hash or reference
    pub fn parse(base: &str) -> Self {
        if base == "ROOT" {
            Self::Root
        } else if base.starts_with('~') || base.starts_with('^') {
            Self::Commit(format!("HEAD{}", base))
        } else {
            Self::Commit(base.to_string())
        }
    }
}

/// Matches file paths against an extension allow-list
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    globset: GlobSet,
}

impl ExtensionFilter {
    pub fn new(extensions: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for ext in extensions {
            let ext = ext.trim_start_matches('.');
            builder.add(Glob::new(&format!("**/*.{}", ext))?);
        }
        Ok(Self {
            globset: builder.build()?,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.globset.is_match(path)
    }
}

/// Get the recognized files that differ between `base` and `head`.
///
/// The result is deduplicated and sorted.
pub fn changed_files(
    repo: &Path,
    base: &Base,
    head: &str,
    filter: &ExtensionFilter,
) -> Result<Vec<String>, VcsError> {
    let stdout = match base {
        Base::Root => run_git(repo, &["ls-files", "-z"])?,
        Base::Commit(commit) => {
            let range = format!("{}...{}", commit, head);
            run_git(repo, &["diff", "--name-only", "-z", &range])?
        }
    };

    // NUL-separated output leaves non-ASCII paths unquoted
    let files: BTreeSet<String> = stdout
        .split('\0')
        .filter(|path| !path.is_empty())
        .filter(|path| {
            let keep = filter.is_match(path);
            if !keep {
                trace!("Skipping unrecognized file: {}", path);
            }
            keep
        })
        .map(str::to_string)
        .collect();

    debug!("Resolved {} recognized changed files", files.len());
    Ok(files.into_iter().collect())
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, VcsError> {
    trace!("Running git {:?} in {}", args, repo.display());
    let output = Command::new("git").args(args).current_dir(repo).output()?;

    if !output.status.success() {
        return Err(VcsError::Failed {
            command: args.join(" "),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> ExtensionFilter {
        let exts: Vec<String> = ["js", "jsx", "ts", "tsx", "py", "rb"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ExtensionFilter::new(&exts).unwrap()
    }

    #[test]
    fn test_base_parse() {
        assert_eq!(Base::parse("ROOT"), Base::Root);
        assert_eq!(Base::parse("^"), Base::Commit("HEAD^".into()));
        assert_eq!(Base::parse("~2"), Base::Commit("HEAD~2".into()));
        assert_eq!(
            Base::parse("origin/main"),
            Base::Commit("origin/main".into())
        );
    }

    #[test]
    fn test_extension_filter() {
        let filter = default_filter();
        assert!(filter.is_match("index.js"));
        assert!(filter.is_match("src/components/App.tsx"));
        assert!(filter.is_match("app/models/user.rb"));
        assert!(filter.is_match("scripts/run.py"));
        assert!(!filter.is_match("README.md"));
        assert!(!filter.is_match("package.json"));
        assert!(!filter.is_match("src/main.rs"));
        assert!(!filter.is_match("src/js"));
    }

    #[test]
    fn test_extension_filter_accepts_leading_dot() {
        let filter = ExtensionFilter::new(&[".go".to_string()]).unwrap();
        assert!(filter.is_match("cmd/main.go"));
    }

    #[test]
    fn test_changed_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        testing::init_repo(
            dir.path(),
            &[
                ("src/z.ts", "export {};\n"),
                ("src/a.py", "pass\n"),
                ("docs/guide.md", "# guide\n"),
            ],
        );

        let files =
            changed_files(dir.path(), &Base::parse("^"), "HEAD", &default_filter()).unwrap();
        assert_eq!(files, vec!["src/a.py", "src/z.ts"]);
    }

    #[test]
    fn test_changed_files_keeps_non_ascii_paths() {
        let dir = tempfile::tempdir().unwrap();
        testing::init_repo(
            dir.path(),
            &[("src/café.js", "let a;\n"), ("src/b.js", "let b;\n")],
        );

        let files =
            changed_files(dir.path(), &Base::parse("^"), "HEAD", &default_filter()).unwrap();
        assert_eq!(files, vec!["src/b.js", "src/café.js"]);

        let files = changed_files(dir.path(), &Base::Root, "HEAD", &default_filter()).unwrap();
        assert!(files.contains(&"src/café.js".to_string()));
    }

    #[test]
    fn test_changed_files_root_lists_tracked_files() {
        let dir = tempfile::tempdir().unwrap();
        testing::init_repo(dir.path(), &[("lib/b.rb", "puts 1\n")]);

        let files = changed_files(dir.path(), &Base::Root, "HEAD", &default_filter()).unwrap();
        assert_eq!(files, vec!["lib/b.rb"]);
    }

    #[test]
    fn test_changed_files_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = changed_files(
            dir.path(),
            &Base::parse("origin/main"),
            "HEAD",
            &default_filter(),
        );
        assert!(result.is_err());
    }
}
