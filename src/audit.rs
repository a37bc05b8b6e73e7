use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, db_access::logged, error::AppResult};

const INSERT_AUDIT: &str = r#"
    INSERT INTO audit_logs (id, user_id, action, resource, metadata)
    VALUES ($1, $2, $3, $4, $5)
"#;

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    logged(
        "audit_insert",
        INSERT_AUDIT,
        sqlx::query(INSERT_AUDIT)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(action)
            .bind(resource)
            .bind(metadata)
            .execute(pool),
    )
    .await?;

    Ok(())
}

/// Writes an audit entry; a failure is logged and never fails the caller.
pub async fn record(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(pool, user_id, action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
