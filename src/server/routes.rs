//! Request handlers: chat plus the three upload-analysis pipelines.
//!
//! Each upload handler acquires scratch storage, runs the fallible pipeline
//! in an inner function, and unconditionally cleans up before returning, so
//! scratch files never outlive their request.

use std::path::PathBuf;
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::error::RequestError;
use super::upload::{save_upload_batch, UploadPolicy};
use super::{AppState, SessionId};
use crate::core::{
    build_prompt, cleanup, extract_archive, read_batch, read_tree, BatchOutcome, ExtensionFilter,
    UploadedFile,
};
use crate::session::clip_history_entry;
use crate::utils::scratch_name;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub message: String,
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, RequestError> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err(RequestError::Input("message must not be empty".to_string()));
    }
    tracing::info!(%session_id, "chat message ({} chars)", message.len());

    // Pull previously uploaded code back into the prompt when any message
    // token matches stored file content.
    let mut prompt = message.clone();
    if let Some(ref transcripts) = state.transcripts {
        match transcripts.search_files(&session_id, &message) {
            Ok(rows) if !rows.is_empty() => {
                tracing::info!(%session_id, hits = rows.len(), "attaching stored file context");
                let context = rows
                    .iter()
                    .map(|row| format!("File: {}\n{}", row.file_name, row.file_content))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                prompt = format!(
                    "Here is relevant code from files uploaded earlier:\n\n{context}\n\n{message}"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%session_id, "stored-file search failed: {err}"),
        }
    }

    let history = state.sessions.history(&session_id).await;
    let reply = state.model.converse(&history, &prompt).await?;
    state
        .sessions
        .append(&session_id, Some(&message), Some(&reply))
        .await;

    Ok(Json(ChatResponse { reply }))
}

/// POST /api/analyze/zip
pub async fn analyze_zip(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, RequestError> {
    let policy = UploadPolicy {
        field_name: "file",
        per_file_limit_mb: state.config.zip_max_size_mb,
        max_files: 1,
        require_zip: true,
    };
    let saved = save_upload_batch(&mut multipart, &policy, &state.config.upload_dir).await?;
    let Some(archive) = saved.into_iter().next() else {
        return Err(RequestError::Input("no ZIP file uploaded".to_string()));
    };
    let extract_dir = state.config.upload_dir.join(scratch_name("extracted", None));

    let result = run_zip_analysis(&state, &session_id, &archive, &extract_dir).await;

    cleanup::remove_files(std::slice::from_ref(&archive.stored_path)).await;
    cleanup::remove_dir(&extract_dir).await;
    result.map(Json)
}

async fn run_zip_analysis(
    state: &AppState,
    session_id: &str,
    archive: &UploadedFile,
    extract_dir: &std::path::Path,
) -> Result<AnalysisResponse, RequestError> {
    let config = &state.config;
    tracing::info!(%session_id, "extracting \"{}\"", archive.original_path);
    extract_archive(
        &archive.stored_path,
        extract_dir,
        Duration::from_millis(config.extraction_timeout_ms),
    )
    .await?;

    let filter = ExtensionFilter::new(&config.allowed_extensions);
    let root = extract_dir.to_path_buf();
    let blob = tokio::task::spawn_blocking(move || read_tree(&root, &filter))
        .await
        .map_err(|err| anyhow::anyhow!("tree read task failed: {err}"))??;

    if blob.trim().is_empty() {
        return Ok(AnalysisResponse {
            message: "Analysis complete".to_string(),
            analysis: "No relevant code files found in the ZIP archive.".to_string(),
        });
    }

    if let Some(ref transcripts) = state.transcripts {
        if let Err(err) = transcripts.record_file(session_id, &archive.original_path, &blob) {
            tracing::warn!(%session_id, "failed to mirror archive content: {err}");
        }
    }

    let description = format!("the ZIP archive \"{}\"", archive.original_path);
    let prompt = build_prompt(&description, &blob, config.max_content_length);
    let history = state.sessions.history(session_id).await;
    let analysis = state.model.converse(&history, &prompt).await?;

    let entry = clip_history_entry(
        &format!("(uploaded ZIP: {}, context: code)", archive.original_path),
        config.max_history_entry_length,
    );
    state
        .sessions
        .append(session_id, Some(&entry), Some(&analysis))
        .await;

    Ok(AnalysisResponse {
        message: format!("ZIP analysis of \"{}\" complete", archive.original_path),
        analysis,
    })
}

/// POST /api/analyze/folder
pub async fn analyze_folder(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, RequestError> {
    let policy = UploadPolicy {
        field_name: "folderFiles",
        per_file_limit_mb: state.config.max_file_size_mb,
        max_files: state.config.max_files_in_folder,
        require_zip: false,
    };
    let files = save_upload_batch(&mut multipart, &policy, &state.config.upload_dir).await?;
    if files.is_empty() {
        return Err(RequestError::Input("no folder files uploaded".to_string()));
    }
    let folder_name = representative_folder_name(&files);
    tracing::info!(%session_id, files = files.len(), "analyzing folder '{}'", folder_name);

    let result = run_batch_analysis(
        &state,
        &session_id,
        &files,
        BatchKind::Folder { folder_name },
    )
    .await;

    let paths: Vec<PathBuf> = files.iter().map(|f| f.stored_path.clone()).collect();
    cleanup::remove_files(&paths).await;
    result.map(Json)
}

/// POST /api/analyze/multifile
pub async fn analyze_multifile(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, RequestError> {
    let policy = UploadPolicy {
        field_name: "multiFiles",
        per_file_limit_mb: state.config.max_file_size_mb,
        max_files: state.config.max_files_in_folder,
        require_zip: false,
    };
    let files = save_upload_batch(&mut multipart, &policy, &state.config.upload_dir).await?;
    if files.is_empty() {
        return Err(RequestError::Input("no files uploaded".to_string()));
    }
    tracing::info!(%session_id, files = files.len(), "analyzing individually selected files");

    let result = run_batch_analysis(&state, &session_id, &files, BatchKind::MultiFile).await;

    let paths: Vec<PathBuf> = files.iter().map(|f| f.stored_path.clone()).collect();
    cleanup::remove_files(&paths).await;
    result.map(Json)
}

enum BatchKind {
    Folder { folder_name: String },
    MultiFile,
}

async fn run_batch_analysis(
    state: &AppState,
    session_id: &str,
    files: &[UploadedFile],
    kind: BatchKind,
) -> Result<AnalysisResponse, RequestError> {
    let config = &state.config;
    let filter = ExtensionFilter::new(&config.allowed_extensions);
    let batch = files.to_vec();
    let skip_denied_roots = matches!(kind, BatchKind::Folder { .. });
    let outcome: BatchOutcome =
        tokio::task::spawn_blocking(move || read_batch(&batch, &filter, skip_denied_roots))
            .await
            .map_err(|err| anyhow::anyhow!("batch read task failed: {err}"))?;

    if outcome.included.is_empty() {
        let place = match kind {
            BatchKind::Folder { .. } => "in the folder",
            BatchKind::MultiFile => "in the selected files",
        };
        return Ok(AnalysisResponse {
            message: "Analysis complete".to_string(),
            analysis: format!("No relevant code files found {place}."),
        });
    }

    if let Some(ref transcripts) = state.transcripts {
        for (name, content) in &outcome.included {
            if let Err(err) = transcripts.record_file(session_id, name, content) {
                tracing::warn!(%session_id, "failed to mirror \"{}\": {err}", name);
            }
        }
    }

    let count = outcome.included.len();
    let (description, entry_text, message) = match kind {
        BatchKind::Folder { folder_name } => (
            format!("the folder '{folder_name}' ({count} files)"),
            format!("(selected folder '{folder_name}' ({count} files), context: code)"),
            format!("Folder analysis of \"{folder_name}\" complete"),
        ),
        BatchKind::MultiFile => {
            let names = outcome.names();
            let summary = if names.len() > 3 {
                format!("{}, ...", names[..3].join(", "))
            } else {
                names.join(", ")
            };
            (
                format!("{count} files: {}", names.join(", ")),
                format!("(uploaded {count} files: {summary}, context: code)"),
                format!("Analysis of {count} files complete"),
            )
        }
    };

    let prompt = build_prompt(&description, &outcome.blob, config.max_content_length);
    let history = state.sessions.history(session_id).await;
    let analysis = state.model.converse(&history, &prompt).await?;

    let entry = clip_history_entry(&entry_text, config.max_history_entry_length);
    state
        .sessions
        .append(session_id, Some(&entry), Some(&analysis))
        .await;

    Ok(AnalysisResponse { message, analysis })
}

/// Folder uploads carry relative paths; the first segment of the first
/// file names the folder for humans.
fn representative_folder_name(files: &[UploadedFile]) -> String {
    files
        .first()
        .and_then(|file| {
            let normalized = file.original_path.replace('\\', "/");
            normalized
                .split_once('/')
                .map(|(first, _)| first.to_string())
        })
        .unwrap_or_else(|| "folder".to_string())
}
