//! Builds context blobs out of uploaded source trees and file batches.
//!
//! Per-file read failures degrade into inline placeholder segments so a
//! single unreadable file never sinks a whole analysis; a failed directory
//! listing is fatal for the read.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use super::error::ReadError;
use super::filter::{is_skipped_name, ExtensionFilter};
use super::UploadedFile;

/// Result of reading an already-materialized upload batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Concatenated, delimited file contents (possibly empty).
    pub blob: String,
    /// (relative name, content) of every successfully read file that passed
    /// the filter. Files skipped by the filter or lost to read failures do
    /// not appear here.
    pub included: Vec<(String, String)>,
}

impl BatchOutcome {
    pub fn names(&self) -> Vec<&str> {
        self.included.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Recursively reads every filter-accepted file under `root` into one
/// delimited context blob.
///
/// Entries are visited in lexicographic file-name order per directory so
/// the blob is deterministic across platforms. Hidden entries (leading `.`)
/// and deny-listed directory names are skipped without descending.
pub fn read_tree(root: &Path, filter: &ExtensionFilter) -> Result<String, ReadError> {
    let mut blob = String::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .map(|name| !name.starts_with('.') && !is_skipped_name(name))
                .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|err| {
            let dir = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory traversal failed"));
            ReadError::DirUnreadable { dir, source }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !filter.should_include(path) {
            continue;
        }

        let relative = relative_display(path.strip_prefix(root).unwrap_or(path));
        match read_file_text(path) {
            Ok(content) => push_segment(&mut blob, &relative, &content),
            Err(err) => {
                tracing::warn!("failed to read {}: {}", path.display(), err);
                push_failure_segment(&mut blob, &relative, &err);
            }
        }
    }

    Ok(blob)
}

/// Reads an upload batch in the order the files arrived.
///
/// With `skip_denied_roots` set (folder uploads), entries whose declared
/// relative path starts with a deny-listed directory are dropped outright.
pub fn read_batch(
    files: &[UploadedFile],
    filter: &ExtensionFilter,
    skip_denied_roots: bool,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for file in files {
        let relative = file.original_path.replace('\\', "/");

        if skip_denied_roots {
            if let Some((first, rest)) = relative.split_once('/') {
                if !rest.is_empty() && is_skipped_name(first) {
                    continue;
                }
            }
        }
        if !filter.should_include(Path::new(&relative)) {
            continue;
        }

        match read_file_text(&file.stored_path) {
            Ok(content) => {
                push_segment(&mut outcome.blob, &relative, &content);
                outcome.included.push((relative, content));
            }
            Err(err) => {
                tracing::warn!(
                    "failed to read uploaded file {} ({}): {}",
                    relative,
                    file.stored_path.display(),
                    err
                );
                push_failure_segment(&mut outcome.blob, &relative, &err);
            }
        }
    }

    outcome
}

fn push_segment(blob: &mut String, relative: &str, content: &str) {
    blob.push_str(&format!("\n\n--- File: {relative} ---\n\n{content}"));
}

fn push_failure_segment(blob: &mut String, relative: &str, err: &std::io::Error) {
    blob.push_str(&format!("\n\n--- File: {relative} (unreadable: {err}) ---\n\n"));
}

/// Reads a file as UTF-8, falling back to a lossy conversion for files with
/// stray invalid bytes. Genuine I/O failures bubble up to the caller.
fn read_file_text(path: &Path) -> Result<String, std::io::Error> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
            let bytes = fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Err(err) => Err(err),
    }
}

fn relative_display(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn filter() -> ExtensionFilter {
        ExtensionFilter::new([".rs", ".md"])
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn tree_round_trip_reproduces_content_verbatim() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs", "fn main() {}\n");
        write(dir.path(), "README.md", "# readme\n");
        write(dir.path(), "logo.png", "not really a png");

        let blob = read_tree(dir.path(), &filter()).unwrap();

        assert!(blob.contains("--- File: src/main.rs ---\n\nfn main() {}\n"));
        assert!(blob.contains("--- File: README.md ---\n\n# readme\n"));
        assert!(!blob.contains("logo.png"));
        assert_eq!(blob.matches("--- File:").count(), 2);
    }

    #[test]
    fn tree_skips_hidden_and_denied_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/lib.rs", "pub fn f() {}");
        write(dir.path(), "node_modules/pkg/index.md", "dep");
        write(dir.path(), ".git/config.md", "git");
        write(dir.path(), ".hidden.rs", "hidden");

        let blob = read_tree(dir.path(), &filter()).unwrap();

        assert!(blob.contains("src/lib.rs"));
        assert!(!blob.contains("node_modules"));
        assert!(!blob.contains(".git"));
        assert!(!blob.contains(".hidden.rs"));
    }

    #[test]
    fn tree_orders_entries_lexicographically() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.rs", "two");
        write(dir.path(), "a.rs", "one");
        write(dir.path(), "c.rs", "three");

        let blob = read_tree(dir.path(), &filter()).unwrap();
        let a = blob.find("a.rs").unwrap();
        let b = blob.find("b.rs").unwrap();
        let c = blob.find("c.rs").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn tree_on_empty_match_returns_empty_blob() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "binary.exe", "x");
        assert_eq!(read_tree(dir.path(), &filter()).unwrap(), "");
    }

    #[test]
    fn missing_root_is_a_fatal_read_error() {
        let err = read_tree(Path::new("/definitely/not/here"), &filter()).unwrap_err();
        let ReadError::DirUnreadable { dir, .. } = err;
        assert_eq!(dir, PathBuf::from("/definitely/not/here"));
    }

    #[test]
    fn batch_reads_in_given_order_and_counts_only_successes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.rs", "first");
        write(dir.path(), "two.rs", "second");

        let files = vec![
            UploadedFile {
                original_path: "two.rs".into(),
                stored_path: dir.path().join("two.rs"),
                size_bytes: 6,
            },
            UploadedFile {
                original_path: "one.rs".into(),
                stored_path: dir.path().join("one.rs"),
                size_bytes: 5,
            },
            UploadedFile {
                original_path: "gone.rs".into(),
                stored_path: dir.path().join("gone.rs"),
                size_bytes: 0,
            },
            UploadedFile {
                original_path: "skipped.exe".into(),
                stored_path: dir.path().join("one.rs"),
                size_bytes: 5,
            },
        ];

        let outcome = read_batch(&files, &filter(), false);

        assert_eq!(outcome.names(), vec!["two.rs", "one.rs"]);
        assert!(outcome.blob.find("two.rs").unwrap() < outcome.blob.find("one.rs").unwrap());
        // The unreadable file leaves a placeholder but is not counted.
        assert!(outcome.blob.contains("--- File: gone.rs (unreadable:"));
        assert!(!outcome.blob.contains("skipped.exe"));
    }

    #[test]
    fn batch_folder_variant_drops_denied_roots() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "kept.rs", "kept");

        let files = vec![
            UploadedFile {
                original_path: "node_modules/pkg/index.rs".into(),
                stored_path: dir.path().join("kept.rs"),
                size_bytes: 4,
            },
            UploadedFile {
                original_path: "proj/app.rs".into(),
                stored_path: dir.path().join("kept.rs"),
                size_bytes: 4,
            },
        ];

        let outcome = read_batch(&files, &filter(), true);
        assert_eq!(outcome.names(), vec!["proj/app.rs"]);
    }
}
