use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::{Collection, Database};

use crate::error::Result;
use crate::store::record::{LogDraft, LogRecord};

/// Collection log records are filed into
pub const LOG_COLLECTION: &str = "logs";

/// Repository performing the single insert the delivery sink needs
pub struct LogRepo {
    collection: Collection<LogRecord>,
}

impl LogRepo {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(LOG_COLLECTION),
        }
    }

    /// Insert one record derived from `draft`.
    ///
    /// Both timestamps are stamped with the persistence instant. Returns the
    /// identifier assigned by the store.
    pub async fn create(&self, draft: LogDraft) -> Result<ObjectId> {
        let now = Utc::now();
        let record = LogRecord {
            id: None,
            created_at: now,
            updated_at: now,
            data: draft.data,
            domain: draft.domain,
            action: draft.action,
            creator: draft.creator,
        };

        let inserted = self.collection.insert_one(record).await?;
        inserted.inserted_id.as_object_id().ok_or_else(|| {
            mongodb::error::Error::custom("store returned a non-ObjectId identifier").into()
        })
    }
}
