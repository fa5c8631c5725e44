//! Persists multipart upload fields into request-scoped scratch storage,
//! enforcing the configured size and count limits while streaming.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart};
use tokio::io::AsyncWriteExt;

use super::error::RequestError;
use crate::core::{cleanup, UploadedFile};
use crate::utils::scratch_name;

/// Limits applied to one upload endpoint.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    /// Multipart field name carrying the files ("file", "folderFiles", ...).
    pub field_name: &'static str,
    pub per_file_limit_mb: u64,
    pub max_files: usize,
    /// ZIP endpoint: reject anything but `.zip` before writing a single byte.
    pub require_zip: bool,
}

/// Drains the matching fields of `multipart` to disk.
///
/// Every error path removes whatever was already persisted, so a rejected
/// upload leaves no scratch files behind. Fields with other names are
/// ignored; a trailing `[]` on the field name (array-style clients) is
/// accepted.
pub async fn save_upload_batch(
    multipart: &mut Multipart,
    policy: &UploadPolicy,
    upload_dir: &Path,
) -> Result<Vec<UploadedFile>, RequestError> {
    let mut saved: Vec<UploadedFile> = Vec::new();
    let limit_bytes = policy.per_file_limit_mb * 1024 * 1024;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                abort(&saved).await;
                return Err(RequestError::Upload(format!(
                    "malformed multipart upload: {err}"
                )));
            }
        };

        let matches_field = field
            .name()
            .map(|name| name == policy.field_name || name.strip_suffix("[]") == Some(policy.field_name))
            .unwrap_or(false);
        if !matches_field {
            continue;
        }

        let original = field.file_name().unwrap_or("unknown_file").to_string();
        if policy.require_zip && !original.to_ascii_lowercase().ends_with(".zip") {
            abort(&saved).await;
            return Err(RequestError::Input(format!(
                "only .zip archives are accepted, got \"{original}\""
            )));
        }
        if saved.len() >= policy.max_files {
            abort(&saved).await;
            let message = if policy.max_files == 1 {
                "only a single archive upload is allowed".to_string()
            } else {
                format!("too many files uploaded (max {})", policy.max_files)
            };
            return Err(RequestError::Upload(message));
        }

        let extension = Path::new(&original)
            .extension()
            .and_then(|ext| ext.to_str());
        let stored_path = upload_dir.join(scratch_name(policy.field_name, extension));

        match stream_to_disk(field, &stored_path, limit_bytes, policy.per_file_limit_mb).await {
            Ok(size_bytes) => saved.push(UploadedFile {
                original_path: original,
                stored_path,
                size_bytes,
            }),
            Err(err) => {
                cleanup::remove_files(std::slice::from_ref(&stored_path)).await;
                abort(&saved).await;
                return Err(err);
            }
        }
    }

    Ok(saved)
}

async fn stream_to_disk(
    mut field: Field<'_>,
    dest: &Path,
    limit_bytes: u64,
    limit_mb: u64,
) -> Result<u64, RequestError> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|err| anyhow::anyhow!("could not create scratch file: {err}"))?;

    let mut written: u64 = 0;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                return Err(RequestError::Upload(format!("upload transfer failed: {err}")));
            }
        };
        written += chunk.len() as u64;
        if written > limit_bytes {
            return Err(RequestError::Upload(format!(
                "uploaded file is too large (max {limit_mb} MB)"
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|err| anyhow::anyhow!("could not write scratch file: {err}"))?;
    }
    file.flush()
        .await
        .map_err(|err| anyhow::anyhow!("could not flush scratch file: {err}"))?;

    Ok(written)
}

async fn abort(saved: &[UploadedFile]) {
    let paths: Vec<PathBuf> = saved.iter().map(|f| f.stored_path.clone()).collect();
    cleanup::remove_files(&paths).await;
}
