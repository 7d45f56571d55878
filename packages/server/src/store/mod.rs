mod engine;
pub mod metadata;
mod txn;

pub use engine::{BlobEngine, BlobTemplate};
pub use txn::with_transaction;
