use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayoutAccount, PayoutAccount, VerificationStatus},
    traits::PayoutAccountError,
};

pub async fn insert_account(
    account: NewPayoutAccount,
    conn: &mut SqliteConnection,
) -> Result<PayoutAccount, PayoutAccountError> {
    let now = Utc::now();
    let account = sqlx::query_as(
        r#"
            INSERT INTO payout_accounts (entity, statement_descriptor, verification_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(account.entity.to_string())
    .bind(account.statement_descriptor)
    .bind(VerificationStatus::Unverified.to_string())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(account)
}

pub async fn fetch_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM payout_accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn update_statement_descriptor(
    account_id: i64,
    descriptor: &str,
    conn: &mut SqliteConnection,
) -> Result<PayoutAccount, PayoutAccountError> {
    let result = sqlx::query("UPDATE payout_accounts SET statement_descriptor = $1, updated_at = $2 WHERE id = $3")
        .bind(descriptor)
        .bind(Utc::now())
        .bind(account_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PayoutAccountError::AccountNotFound(account_id));
    }
    fetch_account(account_id, conn).await?.ok_or(PayoutAccountError::AccountNotFound(account_id))
}

pub async fn update_verification_status(
    account_id: i64,
    status: VerificationStatus,
    conn: &mut SqliteConnection,
) -> Result<PayoutAccount, PayoutAccountError> {
    let result = sqlx::query("UPDATE payout_accounts SET verification_status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(account_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PayoutAccountError::AccountNotFound(account_id));
    }
    fetch_account(account_id, conn).await?.ok_or(PayoutAccountError::AccountNotFound(account_id))
}
