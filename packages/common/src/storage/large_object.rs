use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};

use super::error::StorageError;

/// `INV_READ` flag for `lo_open`.
pub const INV_READ: i32 = 0x0004_0000;
/// `INV_WRITE` flag for `lo_open`.
pub const INV_WRITE: i32 = 0x0002_0000;

/// Access to the Postgres large-object facility, scoped to a caller-supplied
/// transaction.
///
/// Large-object descriptors returned by `lo_open` are only valid for the
/// lifetime of the transaction that opened them, and an OID allocated by
/// [`LargeObjects::create`] is only durable once that transaction commits.
/// Callers therefore hand in the transaction (or any connection that behaves
/// like one) and keep every operation on a given object inside it.
pub struct LargeObjects<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> LargeObjects<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Allocate a new empty large object and return its OID.
    pub async fn create(&self) -> Result<i64, StorageError> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT lo_create(0)::int8 AS oid".to_string(),
        );
        let row = self
            .conn
            .query_one_raw(stmt)
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to create large object: {e}")))?
            .ok_or_else(|| StorageError::Unavailable("lo_create returned no row".to_string()))?;

        Ok(row.try_get::<i64>("", "oid")?)
    }

    /// Open an existing large object for appending writes.
    pub async fn open_write(&self, oid: i64) -> Result<LargeObject<'a, C>, StorageError> {
        self.open(oid, INV_WRITE).await
    }

    /// Open an existing large object for reading, positioned at offset 0.
    pub async fn open_read(&self, oid: i64) -> Result<LargeObject<'a, C>, StorageError> {
        self.open(oid, INV_READ).await
    }

    async fn open(&self, oid: i64, mode: i32) -> Result<LargeObject<'a, C>, StorageError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT lo_open($1::oid, $2) AS fd",
            [oid.into(), mode.into()],
        );
        let row = match self.conn.query_one_raw(stmt).await {
            Ok(Some(row)) => row,
            Ok(None) => return Err(StorageError::NotFound(oid)),
            Err(e) if is_missing_object(&e) => return Err(StorageError::NotFound(oid)),
            Err(e) => return Err(StorageError::Db(e)),
        };

        Ok(LargeObject {
            conn: self.conn,
            fd: row.try_get::<i32>("", "fd")?,
        })
    }

    /// Permanently remove a large object.
    pub async fn unlink(&self, oid: i64) -> Result<(), StorageError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT lo_unlink($1::oid) AS ok",
            [oid.into()],
        );
        match self.conn.query_one_raw(stmt).await {
            Ok(_) => Ok(()),
            Err(e) if is_missing_object(&e) => Err(StorageError::NotFound(oid)),
            Err(e) => Err(StorageError::Db(e)),
        }
    }
}

/// An open large-object descriptor bound to its transaction.
///
/// Writes are append-only for the lifetime of the descriptor; reads advance
/// a server-side cursor starting at offset 0.
pub struct LargeObject<'a, C: ConnectionTrait> {
    conn: &'a C,
    fd: i32,
}

impl<C: ConnectionTrait> LargeObject<'_, C> {
    /// Append a buffer to the object.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT lowrite($1, $2) AS n",
            [self.fd.into(), data.to_vec().into()],
        );
        let row = self
            .conn
            .query_one_raw(stmt)
            .await
            .map_err(|e| StorageError::Stream(format!("failed to write data: {e}")))?
            .ok_or_else(|| StorageError::Stream("lowrite returned no row".to_string()))?;

        let written = row.try_get::<i32>("", "n")?;
        if written as usize != data.len() {
            return Err(StorageError::Stream(format!(
                "short write: {written} of {} bytes",
                data.len()
            )));
        }
        Ok(())
    }

    /// Read up to `len` bytes from the server-side cursor.
    ///
    /// Returns an empty buffer at end of object.
    pub async fn read_chunk(&mut self, len: i32) -> Result<Vec<u8>, StorageError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT loread($1, $2) AS chunk",
            [self.fd.into(), len.into()],
        );
        let row = self
            .conn
            .query_one_raw(stmt)
            .await
            .map_err(|e| StorageError::Stream(format!("failed to read data: {e}")))?
            .ok_or_else(|| StorageError::Stream("loread returned no row".to_string()))?;

        Ok(row.try_get::<Vec<u8>>("", "chunk")?)
    }
}

/// Postgres raises `undefined_object` for lo_open/lo_unlink on an OID that
/// does not exist; there is no cheaper way to distinguish it from other
/// execution errors through the driver.
fn is_missing_object(err: &DbErr) -> bool {
    err.to_string().contains("does not exist")
}
