//! Unpacks uploaded ZIP archives into request-scoped scratch directories.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::ExtractError;

/// Extracts `archive` into `dest`, racing the extraction against `deadline`.
///
/// The destination directory is created first. Losing the race yields
/// `ExtractError::Timeout`; the worker checks a cancel flag between entries
/// and is joined before returning, so nothing keeps writing into the scratch
/// directory after the handler moves on to cleanup. Entries whose names
/// would escape `dest` are skipped.
pub async fn extract_archive(
    archive: &Path,
    dest: &Path,
    deadline: Duration,
) -> Result<(), ExtractError> {
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|err| ExtractError::Failed(format!("could not create {}: {err}", dest.display())))?;

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let worker_flag = cancel_flag.clone();
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let mut task =
        tokio::task::spawn_blocking(move || extract_entries(&archive, &dest, &worker_flag));

    match tokio::time::timeout(deadline, &mut task).await {
        Err(_) => {
            cancel_flag.store(true, Ordering::Relaxed);
            // The worker stops at its next per-entry check; wait for that so
            // no writes overlap with the caller's cleanup.
            let _ = task.await;
            tracing::warn!("archive extraction exceeded its deadline of {:?}", deadline);
            Err(ExtractError::Timeout(deadline))
        }
        Ok(Err(join_err)) => Err(ExtractError::Failed(join_err.to_string())),
        Ok(Ok(result)) => result,
    }
}

fn extract_entries(
    archive: &Path,
    dest: &Path,
    cancel_flag: &AtomicBool,
) -> Result<(), ExtractError> {
    let file = std::fs::File::open(archive)
        .map_err(|err| ExtractError::Failed(format!("could not open archive: {err}")))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|err| ExtractError::Failed(err.to_string()))?;

    for index in 0..zip.len() {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(ExtractError::Failed("extraction cancelled".to_string()));
        }

        let mut entry = zip
            .by_index(index)
            .map_err(|err| ExtractError::Failed(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|err| ExtractError::Failed(err.to_string()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| ExtractError::Failed(err.to_string()))?;
        }
        let mut out = std::fs::File::create(&target)
            .map_err(|err| ExtractError::Failed(err.to_string()))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|err| ExtractError::Failed(err.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_test_zip(path: &Path, entries: &[(String, String)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn entry(name: &str, content: &str) -> (String, String) {
        (name.to_string(), content.to_string())
    }

    #[tokio::test]
    async fn extracts_entries_into_destination() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("input.zip");
        write_test_zip(
            &archive,
            &[entry("src/lib.rs", "pub fn f() {}"), entry("README.md", "hi")],
        );

        let dest = dir.path().join("out");
        extract_archive(&archive, &dest, Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("src/lib.rs")).unwrap(),
            "pub fn f() {}"
        );
        assert_eq!(std::fs::read_to_string(dest.join("README.md")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn corrupt_archive_is_a_typed_failure() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"this is not a zip archive").unwrap();

        let err = extract_archive(&archive, &dir.path().join("out"), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Failed(_)));
    }

    #[tokio::test]
    async fn zero_deadline_times_out_and_stops_writing() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("input.zip");
        let entries: Vec<(String, String)> = (0..400)
            .map(|i| (format!("src/file_{i}.rs"), format!("// contents {i}")))
            .collect();
        write_test_zip(&archive, &entries);

        let dest = dir.path().join("out");
        let err = extract_archive(&archive, &dest, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Timeout(_)));

        // The worker was joined, so the partial output is stable now and a
        // single cleanup pass removes it for good.
        crate::core::cleanup::remove_dir(&dest).await;
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn traversal_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("sneaky.zip");
        write_test_zip(
            &archive,
            &[entry("../escape.txt", "nope"), entry("ok.md", "fine")],
        );

        let dest = dir.path().join("deep").join("out");
        extract_archive(&archive, &dest, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(dest.join("ok.md").exists());
        assert!(!dir.path().join("deep").join("escape.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }
}
