//! GetNotificationHistoryHandler - Query handler for one subscription's audit trail.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, OriginalTransactionId};
use crate::domain::notification::NotificationRecord;
use crate::ports::NotificationLog;

#[derive(Debug, Clone)]
pub struct GetNotificationHistoryQuery {
    pub original_transaction_id: String,
}

pub type GetNotificationHistoryResult = Vec<NotificationRecord>;

/// Handler returning every processing attempt for a subscription, oldest first.
pub struct GetNotificationHistoryHandler {
    log: Arc<dyn NotificationLog>,
}

impl GetNotificationHistoryHandler {
    pub fn new(log: Arc<dyn NotificationLog>) -> Self {
        Self { log }
    }

    pub async fn handle(
        &self,
        query: GetNotificationHistoryQuery,
    ) -> Result<GetNotificationHistoryResult, DomainError> {
        let id = OriginalTransactionId::new(query.original_transaction_id)?;
        self.log.history(&id).await
    }
}
