use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Dispute, DisputeId, DisputeStatus, NewDispute},
    traits::{DisputeApiError, DisputeQueryFilter},
};

pub async fn insert_dispute(dispute: NewDispute, conn: &mut SqliteConnection) -> Result<Dispute, DisputeApiError> {
    let now = Utc::now();
    let dispute = sqlx::query_as(
        r#"
            INSERT INTO disputes (
                id,
                intent_id,
                amount,
                currency,
                status,
                reason,
                opened_at,
                evidence_due_by,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(dispute.id)
    .bind(dispute.intent_id)
    .bind(dispute.amount.value())
    .bind(dispute.currency)
    .bind(DisputeStatus::NeedsResponse.to_string())
    .bind(dispute.reason)
    .bind(dispute.opened_at)
    .bind(dispute.evidence_due_by)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(dispute)
}

pub async fn fetch_dispute(id: &DisputeId, conn: &mut SqliteConnection) -> Result<Option<Dispute>, sqlx::Error> {
    let dispute = sqlx::query_as("SELECT * FROM disputes WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(dispute)
}

/// Fetches disputes according to the criteria in the filter.
///
/// Resulting disputes are ordered by `opened_at` in ascending order.
pub async fn search_disputes(
    filter: DisputeQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Dispute>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM disputes
    "#,
    );
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(intent_id) = filter.intent_id {
        where_clause.push("intent_id = ");
        where_clause.push_bind_unseparated(intent_id.as_str().to_string());
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(since) = filter.opened_since {
        where_clause.push("opened_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    builder.push(" ORDER BY opened_at ASC");

    trace!("⚖️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Dispute>();
    let disputes = query.fetch_all(conn).await?;
    Ok(disputes)
}
