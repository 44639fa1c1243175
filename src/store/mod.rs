//! Record persistence for consumed deliveries
//!
//! This module provides:
//! - `LogDraft`: the JSON shape carried by a delivery payload
//! - `LogRecord`: the persisted document, timestamped at insert
//! - `LogRepo`: a single create operation against the log collection
//! - `RecordSink`: the handoff seam between the delivery loop and storage
//!
//! Persistence is deliberately one insert per delivery. There is no retry
//! here; a failed insert is logged by the caller and the delivery is still
//! acknowledged.

pub mod record;
pub mod repo;
pub mod service;

pub use record::{LogDraft, LogRecord};
pub use repo::{LogRepo, LOG_COLLECTION};
pub use service::{LogService, RecordSink};

use mongodb::bson::doc;
use mongodb::Client;

use crate::error::Result;

/// Connect to the document store and verify it is reachable.
///
/// The driver connects lazily, so a `ping` is issued here to surface
/// connection failures at startup rather than on the first insert.
pub async fn connect(uri: &str) -> Result<Client> {
    let client = Client::with_uri_str(uri).await?;
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await?;
    Ok(client)
}
