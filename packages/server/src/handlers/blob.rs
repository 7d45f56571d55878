use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::storage::BoxReader;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::ingest::{self, FilePart};
use crate::models::blob::{BlobListResponse, BlobResponse, MessageResponse, UploadFailureResponse};
use crate::state::AppState;
use crate::store::BlobTemplate;

/// Page size of the owner-scoped listing.
const LIST_PAGE_SIZE: u64 = 10;

pub fn upload_body_limit(max_upload_size: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_upload_size)
}

/// A multipart file field spooled to disk so the per-file saves can run
/// concurrently after the (sequential) multipart stream is consumed.
struct SpooledFile {
    path: PathBuf,
    file_name: String,
    content_type: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Blobs",
    operation_id = "uploadBlobs",
    summary = "Upload one or more blobs",
    description = "Accepts a multipart body with one or more `files` parts plus optional \
        `targetId` and `targetType` text fields shared by every file. Files are saved \
        concurrently, each in its own transaction: one file's failure does not abort the \
        others. When any file fails the response is 500 with the per-file errors, but the \
        `saved` records listed in the body are durable (partial success).",
    request_body(content_type = "multipart/form-data", description = "Files plus shared template fields"),
    responses(
        (status = 200, description = "All files saved", body = Vec<BlobResponse>),
        (status = 400, description = "Not multipart, or zero files (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (AUTH_MISSING)", body = ErrorBody),
        (status = 500, description = "At least one file failed", body = UploadFailureResponse),
    ),
    security(("caller-identity" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(owner_id = %auth_user.user_id))]
pub async fn upload_blobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut spooled: Vec<SpooledFile> = Vec::new();
    let mut target_id: Option<String> = None;
    let mut target_type: Option<String> = None;

    let collect = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Unable to parse form: {e}")))?
        {
            match field.name() {
                Some("files") => {
                    let file_name = field
                        .file_name()
                        .map(|s| s.to_string())
                        .ok_or_else(|| {
                            AppError::Validation("File field must have a filename".into())
                        })?;
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let path = spool_field(&mut field).await?;
                    spooled.push(SpooledFile {
                        path,
                        file_name,
                        content_type,
                    });
                }
                Some("targetId") => {
                    target_id = Some(read_text_field(field, "targetId").await?);
                }
                Some("targetType") => {
                    target_type = Some(read_text_field(field, "targetType").await?);
                }
                _ => {} // Ignore unknown fields.
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    if let Err(err) = collect {
        remove_spooled(&spooled).await;
        return Err(err);
    }

    if spooled.is_empty() {
        return Err(AppError::Validation("No files uploaded".into()));
    }

    let parts = match open_parts(&spooled).await {
        Ok(parts) => parts,
        Err(err) => {
            remove_spooled(&spooled).await;
            return Err(err);
        }
    };

    let template = BlobTemplate {
        owner_id: auth_user.user_id.clone(),
        target_id,
        target_type,
    };
    let outcome = ingest::ingest_all(Arc::clone(&state.engine), template, parts).await;
    remove_spooled(&spooled).await;

    if outcome.failures.is_empty() {
        let saved: Vec<BlobResponse> = outcome.saved.into_iter().map(BlobResponse::from).collect();
        return Ok((StatusCode::OK, Json(saved)).into_response());
    }

    if outcome.is_partial() {
        tracing::warn!(
            saved = outcome.saved.len(),
            failed = outcome.failures.len(),
            "Multi-file upload partially succeeded; saved blobs remain durable"
        );
    }

    let body = UploadFailureResponse {
        message: outcome.failures.join(", "),
        saved: outcome.saved.into_iter().map(BlobResponse::from).collect(),
        errors: outcome.failures,
    };
    Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BlobListQuery {
    pub page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Blobs",
    operation_id = "listBlobs",
    summary = "List the caller's blobs",
    description = "Returns one page (10 rows) of the caller's blobs ordered by creation \
        time descending.",
    params(("page" = Option<u64>, Query, description = "1-based page number")),
    responses(
        (status = 200, description = "One page of blobs", body = BlobListResponse),
        (status = 400, description = "page < 1 (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (AUTH_MISSING)", body = ErrorBody),
    ),
    security(("caller-identity" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner_id = %auth_user.user_id))]
pub async fn list_blobs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<BlobListQuery>,
) -> Result<Json<BlobListResponse>, AppError> {
    let page = query.page.unwrap_or(1);
    let filters = HashMap::from([("owner_id".to_string(), auth_user.user_id.clone())]);

    let blobs = state
        .engine
        .list_blobs(LIST_PAGE_SIZE, page, &filters)
        .await?;

    Ok(Json(BlobListResponse {
        data: blobs.into_iter().map(BlobResponse::from).collect(),
        page,
        per_page: LIST_PAGE_SIZE,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Blobs",
    operation_id = "getBlobInfo",
    summary = "Get blob metadata",
    params(("id" = String, Path, description = "Blob ID (UUID)")),
    responses(
        (status = 200, description = "Blob metadata", body = BlobResponse),
        (status = 404, description = "Blob not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(blob_id = %id))]
pub async fn get_blob_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BlobResponse>, AppError> {
    let blob = state.engine.get_blob(id).await?;
    Ok(Json(BlobResponse::from(blob)))
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "Blobs",
    operation_id = "downloadBlob",
    summary = "Download blob content",
    description = "Streams the raw content object with a fixed-size relay buffer; memory \
        use is independent of blob size. An interrupted relay truncates the body, which \
        clients detect via the Content-Length mismatch.",
    params(("id" = String, Path, description = "Blob ID (UUID)")),
    responses(
        (status = 200, description = "Raw blob bytes"),
        (status = 404, description = "Blob not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Stream failure (STREAM_FAILURE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(blob_id = %id))]
pub async fn download_blob(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let blob = state.engine.get_blob(id).await?;

    // The relay holds its transaction open for the duration of the
    // download, so it runs in its own task writing into a duplex pipe
    // while the response body reads from the other end.
    let (writer, reader) = tokio::io::duplex(64 * 1024);
    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        if let Err(err) = engine.stream_blob(id, writer).await {
            tracing::error!("Failed to stream blob {id}: {err}");
        }
    });

    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, sanitize_header_value(&blob.content_type))
        .header(header::CONTENT_LENGTH, blob.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&blob.file_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    delete,
    path = "/delete/{id}",
    tag = "Blobs",
    operation_id = "deleteBlob",
    summary = "Delete a blob",
    description = "Removes the metadata row and its content object in one transaction. \
        A regular-role caller may only delete their own blobs.",
    params(("id" = String, Path, description = "Blob ID (UUID)")),
    responses(
        (status = 200, description = "Blob deleted", body = MessageResponse),
        (status = 401, description = "Missing caller identity (AUTH_MISSING)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Blob not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("caller-identity" = [])),
)]
#[instrument(skip(state, auth_user), fields(blob_id = %id, caller = %auth_user.user_id))]
pub async fn delete_blob(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.delete_blob(id, &auth_user).await?;
    Ok(Json(MessageResponse {
        message: "deleted".into(),
    }))
}

/// Stream a multipart field to a temp file, returning its path.
async fn spool_field(
    field: &mut axum::extract::multipart::Field<'_>,
) -> Result<PathBuf, AppError> {
    let temp_path = std::env::temp_dir().join(format!("blobstore-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;

        Ok(temp_path.clone())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}

async fn open_parts(spooled: &[SpooledFile]) -> Result<Vec<FilePart>, AppError> {
    let mut parts = Vec::with_capacity(spooled.len());
    for file in spooled {
        let reader = tokio::fs::File::open(&file.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let source: BoxReader = Box::new(reader);
        parts.push(FilePart {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            source,
        });
    }
    Ok(parts)
}

/// Best effort.
async fn remove_spooled(spooled: &[SpooledFile]) {
    for file in spooled {
        let _ = tokio::fs::remove_file(&file.path).await;
    }
}

/// Strip characters that cannot appear in a header value.
fn sanitize_header_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
