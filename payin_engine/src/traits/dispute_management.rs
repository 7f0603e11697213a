use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Dispute, DisputeId, DisputeStatus, IntentId, NewDispute};

/// Criteria for dispute listings. At least one criterion must be set before the API layer will run the query.
#[derive(Debug, Clone, Default)]
pub struct DisputeQueryFilter {
    pub intent_id: Option<IntentId>,
    pub status: Option<DisputeStatus>,
    pub opened_since: Option<DateTime<Utc>>,
}

impl DisputeQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.intent_id.is_none() && self.status.is_none() && self.opened_since.is_none()
    }

    pub fn with_intent(mut self, intent_id: IntentId) -> Self {
        self.intent_id = Some(intent_id);
        self
    }

    pub fn with_status(mut self, status: DisputeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn opened_since(mut self, since: DateTime<Utc>) -> Self {
        self.opened_since = Some(since);
        self
    }
}

#[derive(Debug, Clone, Error)]
pub enum DisputeApiError {
    #[error("The dispute backend failed: {0}")]
    DatabaseError(String),
    #[error("The requested dispute {0} does not exist")]
    DisputeNotFound(DisputeId),
    #[error("At least one filter criterion is required to list disputes")]
    EmptyQuery,
}

impl From<sqlx::Error> for DisputeApiError {
    fn from(e: sqlx::Error) -> Self {
        DisputeApiError::DatabaseError(e.to_string())
    }
}

/// Storage contract for dispute records mirrored from the provider.
#[async_trait]
pub trait DisputeManagement: Send + Sync {
    /// Stores a dispute as reported by the provider. Records are keyed by the provider's dispute id.
    async fn record_dispute(&self, dispute: NewDispute) -> Result<Dispute, DisputeApiError>;

    async fn fetch_dispute(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeApiError>;

    /// Disputes matching `filter`, ordered by `opened_at` ascending.
    async fn search_disputes(&self, filter: DisputeQueryFilter) -> Result<Vec<Dispute>, DisputeApiError>;
}
