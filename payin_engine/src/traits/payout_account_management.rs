use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{NewPayoutAccount, PayoutAccount, VerificationStatus};

#[derive(Debug, Clone, Error)]
pub enum PayoutAccountError {
    #[error("The payout account backend failed: {0}")]
    DatabaseError(String),
    #[error("The requested payout account {0} does not exist")]
    AccountNotFound(i64),
}

impl From<sqlx::Error> for PayoutAccountError {
    fn from(e: sqlx::Error) -> Self {
        PayoutAccountError::DatabaseError(e.to_string())
    }
}

/// Storage contract for payout accounts. Verification-document handling lives with the onboarding service; this
/// engine only tracks the resulting verification status.
#[async_trait]
pub trait PayoutAccountManagement: Send + Sync {
    async fn create_payout_account(&self, account: NewPayoutAccount) -> Result<PayoutAccount, PayoutAccountError>;

    async fn fetch_payout_account(&self, account_id: i64) -> Result<Option<PayoutAccount>, PayoutAccountError>;

    async fn update_statement_descriptor(
        &self,
        account_id: i64,
        descriptor: &str,
    ) -> Result<PayoutAccount, PayoutAccountError>;

    async fn update_verification_status(
        &self,
        account_id: i64,
        status: VerificationStatus,
    ) -> Result<PayoutAccount, PayoutAccountError>;
}
