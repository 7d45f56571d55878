use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blobs")]
pub struct Model {
    /// UUIDv4 primary key, generated server-side at save time.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Original upload filename, as declared by the client.
    pub file_name: String,

    /// Exact byte count relayed into the content object.
    pub size: i64,

    /// MIME content type, as declared by the client.
    pub content_type: String,

    pub created_at: DateTimeUtc,

    pub last_modified: DateTimeUtc,

    /// OID of the Postgres large object holding the content.
    /// One-to-one with this row and immutable after creation.
    pub data_oid: i64,

    /// Principal that created the blob; always the authenticated caller.
    pub owner_id: String,

    /// Optional association to an external entity.
    pub target_id: Option<String>,

    pub target_type: Option<String>,

    /// Coarse content category derived from the content type
    /// (e.g. "image", "video"), never client-asserted.
    #[sea_orm(column_name = "type")]
    pub kind: String,
}

impl ActiveModelBehavior for ActiveModel {}
