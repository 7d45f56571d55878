use sea_orm::ConnectionTrait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::StorageError;
use super::large_object::LargeObject;

/// Fixed relay buffer size. Memory use of a relay is O(RELAY_BUF),
/// independent of payload size.
pub const RELAY_BUF: usize = 4096;

/// Copy a byte stream into a large object, returning the number of bytes
/// written.
pub async fn relay_in<R, C>(
    reader: &mut R,
    object: &mut LargeObject<'_, C>,
) -> Result<i64, StorageError>
where
    R: AsyncRead + Unpin + ?Sized,
    C: ConnectionTrait,
{
    let mut buffer = [0u8; RELAY_BUF];
    let mut written: i64 = 0;

    loop {
        let n = reader
            .read(&mut buffer)
            .await
            .map_err(|e| StorageError::Stream(format!("failed to read data: {e}")))?;
        if n == 0 {
            break;
        }
        object.write(&buffer[..n]).await?;
        written += n as i64;
    }

    Ok(written)
}

/// Copy a large object into a byte sink, returning the number of bytes
/// relayed. The sink is flushed before returning.
pub async fn relay_out<W, C>(
    object: &mut LargeObject<'_, C>,
    writer: &mut W,
) -> Result<i64, StorageError>
where
    W: AsyncWrite + Unpin + ?Sized,
    C: ConnectionTrait,
{
    let mut written: i64 = 0;

    loop {
        let chunk = object.read_chunk(RELAY_BUF as i32).await?;
        if chunk.is_empty() {
            break;
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| StorageError::Stream(format!("failed to write data: {e}")))?;
        written += chunk.len() as i64;
    }

    writer
        .flush()
        .await
        .map_err(|e| StorageError::Stream(format!("failed to flush sink: {e}")))?;

    Ok(written)
}
