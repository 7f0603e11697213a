use sqlx::SqliteConnection;

use crate::{db_types::ChargeReceipt, traits::IntentStoreError};

pub async fn fetch_receipt(
    idempotency_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ChargeReceipt>, sqlx::Error> {
    let receipt = sqlx::query_as("SELECT * FROM charge_receipts WHERE idempotency_key = $1")
        .bind(idempotency_key)
        .fetch_optional(conn)
        .await?;
    Ok(receipt)
}

/// Stores the receipt, returning `false` if one already existed for the idempotency key. The key is the primary
/// key, so a retried save after a crash lands on the conflict arm instead of duplicating the row.
pub async fn idempotent_insert(receipt: &ChargeReceipt, conn: &mut SqliteConnection) -> Result<bool, IntentStoreError> {
    let result = sqlx::query(
        r#"
            INSERT INTO charge_receipts (
                idempotency_key,
                intent_id,
                provider_charge_id,
                amount,
                currency,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (idempotency_key) DO NOTHING;
        "#,
    )
    .bind(&receipt.idempotency_key)
    .bind(receipt.intent_id.as_str())
    .bind(&receipt.provider_charge_id)
    .bind(receipt.amount.value())
    .bind(&receipt.currency)
    .bind(receipt.created_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
