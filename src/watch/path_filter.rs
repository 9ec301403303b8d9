// src/watch/path_filter.rs

//! Pure "should this path be ignored" predicate.
//!
//! Names and extensions compare case-insensitively. Directory names match
//! whole path components at any depth, never substrings.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::errors::{DevwatchError, Result};

const DEFAULT_IGNORED_DIRECTORIES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    "node_modules",
    "vendor",
    "var",
    "coverage",
];

const DEFAULT_IGNORED_FILENAMES: &[&str] = &[
    ".gitignore",
    ".gitattributes",
    ".gitkeep",
    ".editorconfig",
    ".ds_store",
    "thumbs.db",
    "version.json",
];

const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[".md", ".log", ".lock", ".swp", ".swo", ".tmp", ".bak"];

const DEFAULT_IGNORED_PATTERNS: &[&str] = &["**/node_modules/**", "**/.git/**", "**/*~", "**/.#*"];

#[derive(Debug, Clone)]
pub struct PathFilter {
    directories: BTreeSet<String>,
    filenames: BTreeSet<String>,
    extensions: BTreeSet<String>,
    patterns: Vec<String>,
    globs: GlobSet,
}

impl PathFilter {
    /// Build a filter from explicit lists. Extensions may be given with or
    /// without the leading dot.
    pub fn new<S: AsRef<str>>(
        directories: &[S],
        filenames: &[S],
        extensions: &[S],
        patterns: &[S],
    ) -> Result<Self> {
        let lower = |items: &[S]| -> BTreeSet<String> {
            items.iter().map(|s| s.as_ref().to_lowercase()).collect()
        };
        let extensions = extensions
            .iter()
            .map(|e| {
                let e = e.as_ref().to_lowercase();
                if e.starts_with('.') { e } else { format!(".{e}") }
            })
            .collect();
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let globs = build_globset(&patterns)?;

        Ok(Self {
            directories: lower(directories),
            filenames: lower(filenames),
            extensions,
            patterns,
            globs,
        })
    }

    /// The stock filter: VCS/IDE/dependency directories, dotfiles that
    /// never affect output, docs and editor scratch files.
    pub fn create_default() -> Self {
        match Self::new(
            DEFAULT_IGNORED_DIRECTORIES,
            DEFAULT_IGNORED_FILENAMES,
            DEFAULT_IGNORED_EXTENSIONS,
            DEFAULT_IGNORED_PATTERNS,
        ) {
            Ok(filter) => filter,
            Err(err) => {
                warn!(error = %err, "default ignore patterns failed to compile");
                Self {
                    directories: BTreeSet::new(),
                    filenames: BTreeSet::new(),
                    extensions: BTreeSet::new(),
                    patterns: Vec::new(),
                    globs: GlobSet::empty(),
                }
            }
        }
    }

    /// Add glob patterns on top of the current ones.
    pub fn with_patterns<S: AsRef<str>>(mut self, extra: &[S]) -> Result<Self> {
        if extra.is_empty() {
            return Ok(self);
        }
        self.patterns
            .extend(extra.iter().map(|p| p.as_ref().to_string()));
        self.globs = build_globset(&self.patterns)?;
        Ok(self)
    }

    pub fn should_ignore_directory(&self, name: &str) -> bool {
        self.directories.contains(&name.to_lowercase())
    }

    /// `path` is usually relative to a watch root; absolute paths work for
    /// the name checks but glob patterns are written against relative paths.
    pub fn should_ignore_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return false;
        }

        let components: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        let Some((file_name, parents)) = components.split_last() else {
            return false;
        };

        if parents.iter().any(|dir| self.should_ignore_directory(dir)) {
            return true;
        }

        let file_name = file_name.to_lowercase();
        if self.filenames.contains(&file_name) {
            return true;
        }

        let ext = Path::new(&file_name).extension().and_then(|e| e.to_str());
        if ext.is_some_and(|ext| self.extensions.contains(&format!(".{ext}"))) {
            return true;
        }

        let normalized = components.join("/");
        self.globs.is_match(&normalized)
    }

    pub fn ignored_directories(&self) -> Vec<String> {
        self.directories.iter().cloned().collect()
    }

    pub fn ignored_filenames(&self) -> Vec<String> {
        self.filenames.iter().cloned().collect()
    }

    pub fn ignored_extensions(&self) -> Vec<String> {
        self.extensions.iter().cloned().collect()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::create_default()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    builder
        .build()
        .map_err(|e| DevwatchError::ConfigError(format!("invalid ignore patterns: {e}")))
}

pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|e| DevwatchError::ConfigError(format!("invalid glob pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_names_are_case_insensitive_and_anchored() {
        let filter = PathFilter::create_default();

        assert!(filter.should_ignore_directory("node_modules"));
        assert!(filter.should_ignore_directory("NODE_MODULES"));
        assert!(!filter.should_ignore_directory("src"));

        assert!(filter.should_ignore_path("src/node_modules/package/index.js"));
        assert!(!filter.should_ignore_path("src/my_node_modules_notes/index.js"));
    }

    #[test]
    fn default_rules() {
        let filter = PathFilter::create_default();

        assert!(filter.ignored_filenames().contains(&".gitignore".to_string()));
        assert!(filter.ignored_extensions().contains(&".md".to_string()));

        assert!(filter.should_ignore_path("app/.gitignore"));
        assert!(filter.should_ignore_path("README.md"));
        assert!(filter.should_ignore_path("docs/NOTES.MD"));
        assert!(!filter.should_ignore_path(""));

        assert!(!filter.should_ignore_path("src/Controller/HomeController.php"));
        assert!(!filter.should_ignore_path("resources/styles/app.css"));
        assert!(!filter.should_ignore_path("docs/guide.txt"));
    }

    #[test]
    fn extra_patterns_are_applied() {
        let filter = PathFilter::create_default()
            .with_patterns(&["assets/generated/**"])
            .unwrap();

        assert!(filter.should_ignore_path("assets/generated/app.js"));
        assert!(filter.should_ignore_path("Assets/Generated/app.js"));
        assert!(!filter.should_ignore_path("assets/app.js"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = PathFilter::create_default().with_patterns(&["a/[b"]).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
