use std::collections::HashMap;

use chrono::Utc;
use common::storage::{BoxReader, LargeObjects, relay_in, relay_out, valid_file_type};
use sea_orm::{DatabaseConnection, Set};
use tokio::io::AsyncWrite;
use uuid::Uuid;

use crate::entity::blob;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::store::{metadata, with_transaction};

/// Shared metadata applied to every file of an upload request.
///
/// `owner_id` always comes from the authenticated caller, never from
/// client-supplied metadata.
#[derive(Debug, Clone)]
pub struct BlobTemplate {
    pub owner_id: String,
    pub target_id: Option<String>,
    pub target_type: Option<String>,
}

/// Transactional blob persistence engine.
///
/// Every mutating operation pairs the metadata row with its content object
/// inside one transaction: a committed row always references a fully
/// written large object, and a failed operation leaves neither behind.
pub struct BlobEngine {
    db: DatabaseConnection,
    allowed_types: Vec<String>,
}

impl BlobEngine {
    pub fn new(db: DatabaseConnection, allowed_types: Vec<String>) -> Self {
        Self { db, allowed_types }
    }

    /// Persist one blob: relay `source` into a fresh content object and
    /// insert the metadata row, atomically.
    ///
    /// The content-type check runs before any storage side effect. `size`
    /// is counted during the relay; the client's declaration is ignored.
    pub async fn save_blob(
        &self,
        template: &BlobTemplate,
        file_name: &str,
        content_type: &str,
        mut source: BoxReader,
    ) -> Result<blob::Model, AppError> {
        let kind = valid_file_type(content_type, &self.allowed_types)
            .ok_or_else(|| AppError::InvalidContentType(content_type.to_string()))?
            .trim_end_matches('/')
            .to_string();

        let template = template.clone();
        let file_name = file_name.to_string();
        let content_type = content_type.to_string();

        with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let objects = LargeObjects::new(txn);
                let oid = objects.create().await?;
                let mut object = objects.open_write(oid).await?;
                let size = relay_in(&mut source, &mut object).await?;

                let now = Utc::now();
                let model = blob::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    file_name: Set(file_name),
                    size: Set(size),
                    content_type: Set(content_type),
                    created_at: Set(now),
                    last_modified: Set(now),
                    data_oid: Set(oid),
                    owner_id: Set(template.owner_id),
                    target_id: Set(template.target_id),
                    target_type: Set(template.target_type),
                    kind: Set(kind),
                };

                metadata::insert(txn, model).await
            })
        })
        .await
    }

    pub async fn get_blob(&self, id: Uuid) -> Result<blob::Model, AppError> {
        metadata::get_by_id(&self.db, id).await
    }

    /// One materialized page of blobs, newest first.
    pub async fn list_blobs(
        &self,
        limit: u64,
        page: u64,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<blob::Model>, AppError> {
        metadata::list(&self.db, limit, page, filters).await
    }

    /// Relay the entire content object for `id` into `sink`.
    ///
    /// The sink is consumed and dropped when the relay finishes, so a pipe
    /// reader observes EOF. On a `StreamFailure` the sink has received a
    /// truncated byte stream; the caller must treat the operation as failed
    /// regardless of how many bytes were already flushed.
    pub async fn stream_blob<W>(&self, id: Uuid, mut sink: W) -> Result<(), AppError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let blob = metadata::get_by_id(txn, id).await?;
                let objects = LargeObjects::new(txn);
                let mut object = objects.open_read(blob.data_oid).await?;
                relay_out(&mut object, &mut sink).await?;
                Ok(())
            })
        })
        .await
    }

    /// Delete a blob and its content object atomically.
    ///
    /// A restricted-role caller may only delete their own blobs. If the
    /// content-object unlink fails, the metadata row survives the rollback;
    /// a row is never deleted for a blob whose content could not be
    /// confirmed removed.
    pub async fn delete_blob(&self, id: Uuid, caller: &AuthUser) -> Result<(), AppError> {
        let blob = metadata::get_by_id(&self.db, id).await?;
        if caller.role.is_restricted() && blob.owner_id != caller.user_id {
            return Err(AppError::PermissionDenied);
        }

        with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let objects = LargeObjects::new(txn);
                objects.unlink(blob.data_oid).await?;
                metadata::delete_by_id(txn, id).await
            })
        })
        .await
    }
}
