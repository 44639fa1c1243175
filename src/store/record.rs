use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// A persisted log record.
///
/// Timestamps are stamped at persistence time, not at delivery time;
/// `updated_at` equals `created_at` on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Identifier assigned by the store on insert
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Free-form payload text
    pub data: String,
    /// Owning domain
    pub domain: ObjectId,
    pub action: String,
    /// Creator identity
    #[serde(rename = "user_id")]
    pub creator: String,
}

/// The JSON shape carried by a delivery payload.
///
/// Unknown fields are ignored; missing fields take zero values (empty
/// strings, all-zero domain identifier).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogDraft {
    /// Free-form payload text
    pub data: String,
    /// Owning domain, carried as a hex identifier
    #[serde(rename = "domain_id")]
    pub domain: ObjectId,
    /// Action label
    pub action: String,
    /// Creator identity
    pub creator: String,
}

impl Default for LogDraft {
    fn default() -> Self {
        Self {
            data: String::new(),
            domain: ObjectId::from_bytes([0; 12]),
            action: String::new(),
            creator: String::new(),
        }
    }
}
