mod content_type;
mod error;
mod large_object;
mod relay;

use tokio::io::AsyncRead;

pub use content_type::valid_file_type;
pub use error::StorageError;
pub use large_object::{INV_READ, INV_WRITE, LargeObject, LargeObjects};
pub use relay::{RELAY_BUF, relay_in, relay_out};

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;
