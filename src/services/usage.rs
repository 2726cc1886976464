//! Fire-and-forget usage accounting for API-key authenticated queries.

use tracing::warn;

use crate::db::Store;

/// Spawn the usage update off the request path. The counter increment is
/// atomic inside the store; a failure here is logged and never propagates
/// to the caller's response.
pub fn record_usage(
    store: Store,
    key_id: i32,
    used_by: String,
    query: String,
    ip: Option<String>,
) {
    tokio::spawn(async move {
        if let Err(e) = store
            .record_api_key_usage(key_id, &used_by, &query, ip.as_deref())
            .await
        {
            warn!("Failed to record usage for API key {}: {:#}", key_id, e);
        }
    });
}
