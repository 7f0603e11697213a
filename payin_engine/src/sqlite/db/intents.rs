use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{IntentId, IntentStatus, NewPaymentIntent, PaymentIntent},
    traits::{DueCursor, IntentStoreError, StatusChange},
};

/// Inserts a new payment intent. The caller is responsible for id/key uniqueness checks; constraint violations
/// surface as database errors.
pub async fn insert_intent(
    intent: NewPaymentIntent,
    conn: &mut SqliteConnection,
) -> Result<PaymentIntent, IntentStoreError> {
    let now = Utc::now();
    let intent = sqlx::query_as(
        r#"
            INSERT INTO payment_intents (
                id,
                amount,
                currency,
                status,
                capture_method,
                idempotency_key,
                capture_after,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(intent.id)
    .bind(intent.amount.value())
    .bind(intent.currency)
    .bind(IntentStatus::RequiresCapture.to_string())
    .bind(intent.capture_method.to_string())
    .bind(intent.idempotency_key)
    .bind(intent.capture_after)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(intent)
}

pub async fn fetch_intent(id: &IntentId, conn: &mut SqliteConnection) -> Result<Option<PaymentIntent>, sqlx::Error> {
    let intent = sqlx::query_as("SELECT * FROM payment_intents WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(intent)
}

pub async fn intent_id_exists(id: &IntentId, conn: &mut SqliteConnection) -> Result<bool, IntentStoreError> {
    Ok(fetch_intent(id, conn).await?.is_some())
}

pub async fn idempotency_key_exists(key: &str, conn: &mut SqliteConnection) -> Result<bool, IntentStoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM payment_intents WHERE idempotency_key = $1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// One keyset page of due intents in `(capture_after, id)` order.
pub async fn find_due_for_capture(
    as_of: DateTime<Utc>,
    cursor: Option<DueCursor>,
    limit: usize,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentIntent>, IntentStoreError> {
    let limit = limit as i64;
    let intents = match cursor {
        Some(cursor) => {
            sqlx::query_as(
                r#"
                    SELECT * FROM payment_intents
                    WHERE status = $1 AND capture_after <= $2
                      AND (capture_after > $3 OR (capture_after = $3 AND id > $4))
                    ORDER BY capture_after ASC, id ASC
                    LIMIT $5;
                "#,
            )
            .bind(IntentStatus::RequiresCapture.to_string())
            .bind(as_of)
            .bind(cursor.capture_after)
            .bind(cursor.id.as_str().to_string())
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?
        },
        None => {
            sqlx::query_as(
                r#"
                    SELECT * FROM payment_intents
                    WHERE status = $1 AND capture_after <= $2
                    ORDER BY capture_after ASC, id ASC
                    LIMIT $3;
                "#,
            )
            .bind(IntentStatus::RequiresCapture.to_string())
            .bind(as_of)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?
        },
    };
    trace!("🗃️ Due-intent page returned {} row(s)", intents.len());
    Ok(intents)
}

pub async fn find_stale_in_progress(
    older_than: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentIntent>, IntentStoreError> {
    let intents = sqlx::query_as(
        r#"
            SELECT * FROM payment_intents
            WHERE status = $1 AND updated_at < $2
            ORDER BY updated_at ASC;
        "#,
    )
    .bind(IntentStatus::Capturing.to_string())
    .bind(older_than)
    .fetch_all(conn)
    .await?;
    Ok(intents)
}

/// The optimistic-concurrency guard. Updates the row only if it still carries `expected`, returning whether a row
/// was changed. `updated_at` is always bumped; capture fields only overwrite when the change supplies them.
pub async fn conditional_update_status(
    id: &IntentId,
    expected: IntentStatus,
    new_status: IntentStatus,
    change: StatusChange,
    conn: &mut SqliteConnection,
) -> Result<bool, IntentStoreError> {
    let result = sqlx::query(
        r#"
            UPDATE payment_intents
            SET status = $1,
                updated_at = $2,
                amount_captured = COALESCE($3, amount_captured),
                captured_at = COALESCE($4, captured_at)
            WHERE id = $5 AND status = $6;
        "#,
    )
    .bind(new_status.to_string())
    .bind(Utc::now())
    .bind(change.amount_captured.map(|m| m.value()))
    .bind(change.captured_at)
    .bind(id.as_str())
    .bind(expected.to_string())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
