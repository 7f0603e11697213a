use log::*;

use crate::{
    db_types::{Dispute, DisputeId, NewDispute},
    traits::{DisputeApiError, DisputeManagement, DisputeQueryFilter},
};

/// Lookup and listing API for dispute records.
#[derive(Debug, Clone)]
pub struct DisputeApi<B> {
    db: B,
}

impl<B> DisputeApi<B>
where B: DisputeManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Mirrors a dispute reported by the provider into the local store.
    pub async fn record_dispute(&self, dispute: NewDispute) -> Result<Dispute, DisputeApiError> {
        let dispute = self.db.record_dispute(dispute).await?;
        info!("⚖️ Dispute {} recorded against intent {} ({})", dispute.id, dispute.intent_id, dispute.reason);
        Ok(dispute)
    }

    pub async fn get_dispute(&self, id: &DisputeId) -> Result<Dispute, DisputeApiError> {
        self.db.fetch_dispute(id).await?.ok_or_else(|| DisputeApiError::DisputeNotFound(id.clone()))
    }

    /// Lists disputes matching `filter`. An empty filter is rejected outright so that a programming slip cannot
    /// dump the entire dispute table.
    pub async fn list_disputes(&self, filter: DisputeQueryFilter) -> Result<Vec<Dispute>, DisputeApiError> {
        if filter.is_empty() {
            return Err(DisputeApiError::EmptyQuery);
        }
        let disputes = self.db.search_disputes(filter).await?;
        debug!("⚖️ Dispute search returned {} record(s)", disputes.len());
        Ok(disputes)
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::db_types::DisputeStatus;

    mock! {
        pub Disputes {}

        #[async_trait]
        impl DisputeManagement for Disputes {
            async fn record_dispute(&self, dispute: NewDispute) -> Result<Dispute, DisputeApiError>;
            async fn fetch_dispute(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeApiError>;
            async fn search_disputes(&self, filter: DisputeQueryFilter) -> Result<Vec<Dispute>, DisputeApiError>;
        }
    }

    #[tokio::test]
    async fn listing_requires_at_least_one_criterion() {
        let mut db = MockDisputes::new();
        db.expect_search_disputes().times(0);
        let api = DisputeApi::new(db);
        let err = api.list_disputes(DisputeQueryFilter::default()).await.unwrap_err();
        assert!(matches!(err, DisputeApiError::EmptyQuery));
    }

    #[tokio::test]
    async fn a_filtered_listing_reaches_the_backend() {
        let mut db = MockDisputes::new();
        db.expect_search_disputes()
            .withf(|filter| filter.status == Some(DisputeStatus::NeedsResponse))
            .times(1)
            .returning(|_| Ok(vec![]));
        let api = DisputeApi::new(db);
        let disputes =
            api.list_disputes(DisputeQueryFilter::default().with_status(DisputeStatus::NeedsResponse)).await.unwrap();
        assert!(disputes.is_empty());
    }

    #[tokio::test]
    async fn missing_disputes_surface_as_not_found() {
        let mut db = MockDisputes::new();
        db.expect_fetch_dispute().times(1).returning(|_| Ok(None));
        let api = DisputeApi::new(db);
        let err = api.get_dispute(&DisputeId("dp_missing".to_string())).await.unwrap_err();
        assert!(matches!(err, DisputeApiError::DisputeNotFound(id) if id.as_str() == "dp_missing"));
    }
}
