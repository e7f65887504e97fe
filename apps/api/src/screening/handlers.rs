//! Axum route handlers for screening jobs.

use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::BatchResult;
use crate::screening::batch::cleanup_files;
use crate::state::AppState;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

const JD_FIELD: &str = "jd";
const FILES_FIELD: &str = "files";
const COMPLETE_MESSAGE: &str = "Processing complete";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Raw multipart payload of a screening job, before validation.
#[derive(Debug, Default)]
pub struct JobUpload {
    pub jd: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,
    pub message: String,
    pub total_files: usize,
    #[serde(flatten)]
    pub result: BatchResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /start-job
///
/// Multipart form with one `jd` text field and one or more `files` parts.
/// Runs the whole batch before responding.
pub async fn handle_start_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StartJobResponse>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    validate_upload(&upload, state.config.max_upload_files)?;

    let job_id = Uuid::new_v4();
    info!(%job_id, files = upload.files.len(), "Starting screening job");

    let paths = save_files(&state.config.upload_dir, job_id, &upload.files).await?;
    let result = state.processor.process(&upload.jd, &paths).await;

    info!(%job_id, status = ?result.status, processed = result.processed, "Screening job finished");

    Ok(Json(StartJobResponse {
        job_id,
        message: COMPLETE_MESSAGE.to_string(),
        total_files: paths.len(),
        result,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload handling
// ────────────────────────────────────────────────────────────────────────────

pub async fn read_upload(multipart: &mut Multipart) -> Result<JobUpload, AppError> {
    let mut upload = JobUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            JD_FIELD => upload.jd = field.text().await?,
            FILES_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                upload.files.push(UploadedFile { file_name, data });
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    Ok(upload)
}

pub fn validate_upload(upload: &JobUpload, max_files: usize) -> Result<(), AppError> {
    if upload.jd.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    if upload.files.is_empty() {
        return Err(AppError::Validation(
            "At least one resume file is required".to_string(),
        ));
    }
    if upload.files.len() > max_files {
        return Err(AppError::Validation(format!(
            "Maximum {max_files} files allowed"
        )));
    }

    for file in &upload.files {
        if base_name(&file.file_name).is_none() {
            return Err(AppError::Validation(
                "All files must have a filename".to_string(),
            ));
        }
        if !has_allowed_extension(&file.file_name) {
            return Err(AppError::Validation(format!(
                "File {} has an unsupported type. Allowed: .pdf, .docx, .doc",
                file.file_name
            )));
        }
    }

    Ok(())
}

/// Writes each file to `<upload_dir>/<job_id>_<index>_<basename>`, in upload order.
/// The index keeps same-named uploads apart.
/// On any failure, files already written are removed before returning.
pub async fn save_files(
    upload_dir: &Path,
    job_id: Uuid,
    files: &[UploadedFile],
) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut saved = Vec::with_capacity(files.len());

    for (index, file) in files.iter().enumerate() {
        let Some(name) = base_name(&file.file_name) else {
            continue;
        };
        let path = upload_dir.join(format!("{job_id}_{index}_{name}"));

        if let Err(e) = tokio::fs::write(&path, &file.data).await {
            error!("Failed to save {}: {e}", path.display());
            cleanup_files(&saved).await;
            return Err(e);
        }
        debug!("Saved upload {} ({} bytes)", path.display(), file.data.len());
        saved.push(path);
    }

    Ok(saved)
}

/// Final path component of a client-supplied file name. Directory parts are dropped.
fn base_name(file_name: &str) -> Option<&str> {
    Path::new(file_name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
}

fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
