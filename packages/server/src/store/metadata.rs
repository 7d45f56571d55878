use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr,
};
use uuid::Uuid;

use crate::entity::blob;
use crate::error::AppError;

/// Resolve a filter key against the allow-list of filterable columns.
///
/// Filter values are always bound as statement parameters; validating the
/// key here keeps client-supplied field names out of generated SQL entirely.
fn filter_column(key: &str) -> Option<blob::Column> {
    match key {
        "owner_id" => Some(blob::Column::OwnerId),
        "target_id" => Some(blob::Column::TargetId),
        "target_type" => Some(blob::Column::TargetType),
        "type" => Some(blob::Column::Kind),
        "content_type" => Some(blob::Column::ContentType),
        _ => None,
    }
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    model: blob::ActiveModel,
) -> Result<blob::Model, AppError> {
    match model.insert(conn).await {
        Ok(inserted) => Ok(inserted),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict("blob identifier already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<blob::Model, AppError> {
    blob::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("blob {id} not found")))
}

/// One page of blobs, newest first. `filters` is an exact-match AND over
/// the filterable columns.
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    limit: u64,
    page: u64,
    filters: &HashMap<String, String>,
) -> Result<Vec<blob::Model>, AppError> {
    if page < 1 {
        return Err(AppError::InvalidArgument("page must be >= 1".into()));
    }

    let mut select = blob::Entity::find();
    for (key, value) in filters {
        let column = filter_column(key)
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown filter field: {key}")))?;
        select = select.filter(column.eq(value.clone()));
    }

    select
        .order_by_desc(blob::Column::CreatedAt)
        .offset(Some((page - 1) * limit))
        .limit(Some(limit))
        .all(conn)
        .await
        .map_err(AppError::from)
}

pub async fn delete_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), AppError> {
    let result = blob::Entity::delete_by_id(id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("blob {id} not found")));
    }
    Ok(())
}
