use std::collections::HashSet;
use std::path::Path;

/// Directory names that are never descended into or included, matched
/// case-insensitively against every path segment.
pub const SKIPPED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "vendor",
    "build",
    "dist",
    ".git",
    ".svn",
    "target",
    "out",
    "__pycache__",
];

/// Returns true when `name` is one of the fixed deny-listed directory names.
pub fn is_skipped_name(name: &str) -> bool {
    SKIPPED_DIRECTORIES
        .iter()
        .any(|skip| skip.eq_ignore_ascii_case(name))
}

/// Decides whether a file takes part in context assembly.
///
/// A path is included iff its extension (the suffix after the last `.`,
/// compared case-insensitively) is on the allow-list AND no path segment
/// matches the directory deny-list. Pure; no filesystem access.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    allowed: HashSet<String>,
}

impl ExtensionFilter {
    /// Builds a filter from configured extensions. Entries may be given
    /// with or without a leading dot (`".rs"` and `"rs"` are equivalent).
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn should_include(&self, path: &Path) -> bool {
        let denied_segment = path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(is_skipped_name)
        });
        if denied_segment {
            return false;
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.allowed.contains(&ext.to_ascii_lowercase()),
            // Dotfiles like `.gitignore` have no extension and never match.
            None => false,
        }
    }
}
