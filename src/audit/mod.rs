pub use handlers::list_audit_log;
pub use models::AuditEntry;
pub use repository::{AuditSink, InMemoryAuditSink, PostgresAuditSink};

mod handlers;
pub mod models;
pub mod repository;

use tracing::warn;

/// Writes an audit entry without ever failing the calling operation.
pub async fn record(sink: &(dyn AuditSink + Send + Sync), entry: AuditEntry) {
    if let Err(err) = sink.record(&entry).await {
        warn!(
            error = %err,
            action = %entry.action,
            target_type = %entry.target_type,
            target_id = %entry.target_id,
            "Audit log write failed; continuing"
        );
    }
}
