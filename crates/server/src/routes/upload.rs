use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::spawn_blocking;
use tracing::Instrument;

use docscribe_common::api::{allowed_file, render, secure_filename, FileKind, UploadResponse};
use docscribe_extract_archive::{process_zip_file, ArchiveStatus};
use docscribe_extract_audio::transcribe_audio;
use docscribe_extract_dispatch::dispatch_from_path;

use crate::AppState;

use super::error_response;

/// Reply for an uploaded archive, whatever its members produced.
pub const ZIP_PROCESSED: &str = "Processed ZIP. Check output folder.";

const FILE_FIELD: &str = "file";

// ── POST /api/upload ──────────────────────────────────────────────────────────

pub async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let request_id = format!(
        "req_{}_{}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        uuid::Uuid::new_v4().simple()
    );
    handle_upload(state, multipart)
        .instrument(tracing::info_span!("upload", %request_id))
        .await
}

struct UploadedFile {
    file_name: String,
    bytes: axum::body::Bytes,
}

async fn handle_upload(state: Arc<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_file_field(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::warn!("bad multipart body: {}", e.body_text());
            return error_response(e.status(), e.body_text());
        }
    };

    let Some(upload) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file part");
    };
    if upload.file_name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No selected file");
    }

    // The sanitized name is checked too: sanitizing can strip the extension.
    let filename = secure_filename(&upload.file_name);
    let kind = FileKind::from_path(Path::new(&filename));
    let kind = match kind {
        Some(kind) if allowed_file(&upload.file_name) && allowed_file(&filename) => kind,
        _ => {
            tracing::info!("rejected upload {:?}", upload.file_name);
            return error_response(StatusCode::BAD_REQUEST, "File type not allowed");
        }
    };

    let upload_dir = &state.config.server.upload_dir;
    let file_path = upload_dir.join(&filename);
    if let Err(e) = save_upload(upload_dir, &file_path, &upload.bytes).await {
        tracing::error!("Failed to save upload {}: {e}", file_path.display());
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file");
    }
    tracing::info!("saved {} ({kind}, {} bytes)", file_path.display(), upload.bytes.len());

    let span = tracing::Span::current();
    let worker_state = state.clone();
    let outcome = spawn_blocking(move || {
        let _enter = span.enter();
        process_saved(&worker_state, &file_path, &filename, kind)
    })
    .await;

    match outcome {
        Ok(Outcome::Result(result)) => Json(UploadResponse { result }).into_response(),
        Ok(Outcome::ArchiveRejected(reason)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, reason)
        }
        Err(e) => {
            tracing::error!("upload worker failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error while processing file")
        }
    }
}

/// Find the `file` part.  Parts with another name, or named `file` but
/// without a filename (plain form fields), are skipped.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<UploadedFile>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if let Some(file_name) = file_part_name(&field) {
            let bytes = field.bytes().await?;
            return Ok(Some(UploadedFile { file_name, bytes }));
        }
    }
    Ok(None)
}

fn file_part_name(field: &Field<'_>) -> Option<String> {
    if field.name() != Some(FILE_FIELD) {
        return None;
    }
    field.file_name().map(str::to_string)
}

async fn save_upload(upload_dir: &Path, file_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(file_path, bytes).await
}

enum Outcome {
    Result(String),
    ArchiveRejected(String),
}

/// Run the blocking extraction for a saved upload.
fn process_saved(state: &AppState, file_path: &Path, filename: &str, kind: FileKind) -> Outcome {
    let settings = &state.config.server;
    match kind {
        FileKind::Archive => {
            let report = process_zip_file(
                file_path,
                &settings.output_dir,
                &settings.scratch_dir,
                state.model.as_ref(),
            );
            let reason = match report.status {
                ArchiveStatus::Processed => None,
                ArchiveStatus::Missing => Some("archive not found".to_string()),
                ArchiveStatus::Unreadable(reason) => Some(format!("unreadable archive: {reason}")),
                ArchiveStatus::OutputUnavailable(reason) => Some(reason),
            };
            match reason {
                Some(reason) if settings.report_archive_errors => Outcome::ArchiveRejected(reason),
                _ => Outcome::Result(ZIP_PROCESSED.to_string()),
            }
        }
        FileKind::Audio => {
            let output = transcript_path(&settings.output_dir, filename);
            Outcome::Result(render(transcribe_audio(file_path, &output, state.model.as_ref())))
        }
        FileKind::Text | FileKind::WordDocument | FileKind::Pdf => {
            Outcome::Result(render(dispatch_from_path(file_path, kind)))
        }
    }
}

/// Single audio uploads keep the full file name: `call.mp3` -> `call.mp3.txt`.
fn transcript_path(output_dir: &Path, filename: &str) -> PathBuf {
    output_dir.join(format!("{filename}.txt"))
}
