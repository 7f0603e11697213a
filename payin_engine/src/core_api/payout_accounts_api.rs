use log::*;

use crate::{
    db_types::{NewPayoutAccount, PayoutAccount, VerificationStatus},
    traits::{PayoutAccountError, PayoutAccountManagement},
};

/// Query and lifecycle API for payout accounts.
#[derive(Debug, Clone)]
pub struct PayoutAccountApi<B> {
    db: B,
}

impl<B> PayoutAccountApi<B>
where B: PayoutAccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a payout account for a marketplace entity. The statement descriptor falls back to the platform
    /// default unless the caller set one.
    pub async fn create_payout_account(&self, account: NewPayoutAccount) -> Result<PayoutAccount, PayoutAccountError> {
        let account = self.db.create_payout_account(account).await?;
        info!("🏧️ Payout account #{} created for {}", account.id, account.entity);
        Ok(account)
    }

    pub async fn fetch_payout_account(&self, account_id: i64) -> Result<PayoutAccount, PayoutAccountError> {
        self.db.fetch_payout_account(account_id).await?.ok_or(PayoutAccountError::AccountNotFound(account_id))
    }

    pub async fn update_statement_descriptor(
        &self,
        account_id: i64,
        descriptor: &str,
    ) -> Result<PayoutAccount, PayoutAccountError> {
        let account = self.db.update_statement_descriptor(account_id, descriptor).await?;
        debug!("🏧️ Payout account #{account_id} statement descriptor updated");
        Ok(account)
    }

    /// Records the verification verdict reached by the onboarding service.
    pub async fn update_verification_status(
        &self,
        account_id: i64,
        status: VerificationStatus,
    ) -> Result<PayoutAccount, PayoutAccountError> {
        let account = self.db.update_verification_status(account_id, status).await?;
        info!("🏧️ Payout account #{account_id} verification status is now {status}");
        Ok(account)
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::db_types::PayoutEntityType;

    mock! {
        pub Accounts {}

        #[async_trait]
        impl PayoutAccountManagement for Accounts {
            async fn create_payout_account(&self, account: NewPayoutAccount) -> Result<PayoutAccount, PayoutAccountError>;
            async fn fetch_payout_account(&self, account_id: i64) -> Result<Option<PayoutAccount>, PayoutAccountError>;
            async fn update_statement_descriptor(&self, account_id: i64, descriptor: &str) -> Result<PayoutAccount, PayoutAccountError>;
            async fn update_verification_status(&self, account_id: i64, status: VerificationStatus) -> Result<PayoutAccount, PayoutAccountError>;
        }
    }

    fn account(id: i64) -> PayoutAccount {
        PayoutAccount {
            id,
            entity: PayoutEntityType::Merchant,
            statement_descriptor: "MARKETPLACE PAYOUT".to_string(),
            verification_status: VerificationStatus::Unverified,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_accounts_surface_as_not_found() {
        let mut db = MockAccounts::new();
        db.expect_fetch_payout_account().times(1).returning(|_| Ok(None));
        let api = PayoutAccountApi::new(db);
        let err = api.fetch_payout_account(99).await.unwrap_err();
        assert!(matches!(err, PayoutAccountError::AccountNotFound(99)));
    }

    #[tokio::test]
    async fn create_passes_the_descriptor_through() {
        let mut db = MockAccounts::new();
        db.expect_create_payout_account()
            .withf(|acc| acc.statement_descriptor == "MARKETPLACE PAYOUT" && acc.entity == PayoutEntityType::Merchant)
            .times(1)
            .returning(|_| Ok(account(1)));
        let api = PayoutAccountApi::new(db);
        let created = api.create_payout_account(NewPayoutAccount::new(PayoutEntityType::Merchant)).await.unwrap();
        assert_eq!(created.id, 1);
    }
}
