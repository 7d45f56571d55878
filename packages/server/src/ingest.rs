use std::sync::Arc;

use common::storage::BoxReader;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::entity::blob;
use crate::store::{BlobEngine, BlobTemplate};

/// One file of a multi-file upload request.
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub source: BoxReader,
}

/// Aggregated result of a fan-out upload.
///
/// `saved` and `failures` are accumulated independently; order within
/// `saved` is not guaranteed to match input order. A non-empty `failures`
/// means the request as a whole failed even though every blob in `saved`
/// is durable — partial success is deliberate and must be reported as such.
pub struct IngestOutcome {
    pub saved: Vec<blob::Model>,
    pub failures: Vec<String>,
}

impl IngestOutcome {
    pub fn is_partial(&self) -> bool {
        !self.saved.is_empty() && !self.failures.is_empty()
    }
}

/// Save every file part concurrently, one independent transaction per part.
///
/// All parts are dispatched up front (concurrency is bounded only by the
/// connection pool) and joined as a barrier: the call returns only after
/// every save has finished. One part's failure never cancels a sibling.
/// Each failure message is prefixed with the file's name so callers can
/// tell which inputs failed.
#[instrument(skip_all, fields(parts = parts.len()))]
pub async fn ingest_all(
    engine: Arc<BlobEngine>,
    template: BlobTemplate,
    parts: Vec<FilePart>,
) -> IngestOutcome {
    let mut tasks = JoinSet::new();

    for part in parts {
        let engine = engine.clone();
        let template = template.clone();
        tasks.spawn(async move {
            let FilePart {
                file_name,
                content_type,
                source,
            } = part;
            let result = engine
                .save_blob(&template, &file_name, &content_type, source)
                .await;
            (file_name, result)
        });
    }

    let mut saved = Vec::new();
    let mut failures = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(blob))) => saved.push(blob),
            Ok((file_name, Err(err))) => failures.push(format!("{file_name}: {err}")),
            Err(join_err) => failures.push(format!("upload task failed: {join_err}")),
        }
    }

    IngestOutcome { saved, failures }
}
