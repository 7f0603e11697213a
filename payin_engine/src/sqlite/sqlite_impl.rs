use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    db_types::{
        ChargeReceipt,
        Dispute,
        DisputeId,
        IntentId,
        IntentStatus,
        NewDispute,
        NewPaymentIntent,
        NewPayoutAccount,
        PaymentIntent,
        PayoutAccount,
        VerificationStatus,
    },
    sqlite::{db, new_pool},
    traits::{
        DisputeApiError,
        DisputeManagement,
        DisputeQueryFilter,
        DueCursor,
        IntentStoreError,
        PaymentIntentStore,
        PayoutAccountError,
        PayoutAccountManagement,
        StatusChange,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, IntentStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// An in-memory database with the schema applied. Pinned to a single connection, since every `sqlite::memory:`
    /// connection is a distinct database.
    pub async fn new_in_memory() -> Result<Self, IntentStoreError> {
        let db = Self::new_with_url("sqlite::memory:", 1).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), IntentStoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IntentStoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PaymentIntentStore for SqliteDatabase {
    async fn insert_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        if db::intents::intent_id_exists(&intent.id, &mut conn).await? {
            return Err(IntentStoreError::DuplicateIntent(intent.id));
        }
        if db::intents::idempotency_key_exists(&intent.idempotency_key, &mut conn).await? {
            return Err(IntentStoreError::DuplicateIdempotencyKey(intent.idempotency_key));
        }
        db::intents::insert_intent(intent, &mut conn).await
    }

    async fn fetch_intent(&self, id: &IntentId) -> Result<Option<PaymentIntent>, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::intents::fetch_intent(id, &mut conn).await?)
    }

    async fn find_due_for_capture(
        &self,
        as_of: DateTime<Utc>,
        cursor: Option<DueCursor>,
        limit: usize,
    ) -> Result<Vec<PaymentIntent>, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::intents::find_due_for_capture(as_of, cursor, limit, &mut conn).await
    }

    async fn find_stale_in_progress(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::intents::find_stale_in_progress(older_than, &mut conn).await
    }

    async fn conditional_update_status(
        &self,
        id: &IntentId,
        expected: IntentStatus,
        new_status: IntentStatus,
        change: StatusChange,
    ) -> Result<bool, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::intents::conditional_update_status(id, expected, new_status, change, &mut conn).await
    }

    async fn get_receipt(&self, idempotency_key: &str) -> Result<Option<ChargeReceipt>, IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::receipts::fetch_receipt(idempotency_key, &mut conn).await?)
    }

    async fn save_receipt(&self, receipt: &ChargeReceipt) -> Result<(), IntentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::receipts::idempotent_insert(receipt, &mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl PayoutAccountManagement for SqliteDatabase {
    async fn create_payout_account(&self, account: NewPayoutAccount) -> Result<PayoutAccount, PayoutAccountError> {
        let mut conn = self.pool.acquire().await?;
        db::payout_accounts::insert_account(account, &mut conn).await
    }

    async fn fetch_payout_account(&self, account_id: i64) -> Result<Option<PayoutAccount>, PayoutAccountError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::payout_accounts::fetch_account(account_id, &mut conn).await?)
    }

    async fn update_statement_descriptor(
        &self,
        account_id: i64,
        descriptor: &str,
    ) -> Result<PayoutAccount, PayoutAccountError> {
        let mut conn = self.pool.acquire().await?;
        db::payout_accounts::update_statement_descriptor(account_id, descriptor, &mut conn).await
    }

    async fn update_verification_status(
        &self,
        account_id: i64,
        status: VerificationStatus,
    ) -> Result<PayoutAccount, PayoutAccountError> {
        let mut conn = self.pool.acquire().await?;
        db::payout_accounts::update_verification_status(account_id, status, &mut conn).await
    }
}

#[async_trait]
impl DisputeManagement for SqliteDatabase {
    async fn record_dispute(&self, dispute: NewDispute) -> Result<Dispute, DisputeApiError> {
        let mut conn = self.pool.acquire().await?;
        db::disputes::insert_dispute(dispute, &mut conn).await
    }

    async fn fetch_dispute(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::disputes::fetch_dispute(id, &mut conn).await?)
    }

    async fn search_disputes(&self, filter: DisputeQueryFilter) -> Result<Vec<Dispute>, DisputeApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::disputes::search_disputes(filter, &mut conn).await?)
    }
}
