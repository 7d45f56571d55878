use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::blob;

/// Response DTO for a single blob. The content-object OID stays internal.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BlobResponse {
    /// Blob ID (UUIDv4).
    #[schema(example = "0191f3a0-1234-4abc-8000-000000000001")]
    pub id: String,
    /// Original upload filename.
    #[schema(example = "avatar.png")]
    pub file_name: String,
    /// Blob size in bytes, as counted during the write.
    #[schema(example = 142857)]
    pub size: i64,
    /// MIME content type declared by the client.
    #[schema(example = "image/png")]
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Owning principal.
    #[schema(example = "u1")]
    pub owner_id: String,
    /// Optional external association.
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    /// Derived content category.
    #[schema(example = "image")]
    pub r#type: String,
}

impl From<blob::Model> for BlobResponse {
    fn from(model: blob::Model) -> Self {
        Self {
            id: model.id.to_string(),
            file_name: model.file_name,
            size: model.size,
            content_type: model.content_type,
            created_at: model.created_at,
            last_modified: model.last_modified,
            owner_id: model.owner_id,
            target_id: model.target_id,
            target_type: model.target_type,
            r#type: model.kind,
        }
    }
}

/// Response DTO for the owner-scoped listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BlobListResponse {
    pub data: Vec<BlobResponse>,
    pub page: u64,
    pub per_page: u64,
}

/// Returned with status 500 when at least one file of a multi-file upload
/// failed. `saved` records are durable despite the failure status.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadFailureResponse {
    /// Joined per-file error messages.
    pub message: String,
    /// Blobs that were saved before/alongside the failures.
    pub saved: Vec<BlobResponse>,
    /// One entry per failed file, prefixed with its filename.
    pub errors: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "deleted")]
    pub message: String,
}
