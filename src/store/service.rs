use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::store::record::LogDraft;
use crate::store::repo::LogRepo;

/// Destination for records derived from delivery payloads.
///
/// The delivery loop only constructs the in-memory draft and hands it off;
/// implementations own persistence. Failures are reported back so the loop
/// can log them, but the loop never retries a draft.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a single record
    async fn persist(&self, draft: LogDraft) -> Result<()>;
}

/// Mongo-backed sink used by the running service
pub struct LogService {
    repo: LogRepo,
}

impl LogService {
    pub fn new(repo: LogRepo) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RecordSink for LogService {
    async fn persist(&self, draft: LogDraft) -> Result<()> {
        let id = self.repo.create(draft).await?;
        debug!(record_id = %id, "log record stored");
        Ok(())
    }
}
