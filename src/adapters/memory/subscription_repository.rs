//! In-memory implementation of SubscriptionRepository.
//!
//! A single async mutex guards the whole map and is held from `compute`
//! through the write, which serializes every key. Suitable for tests and
//! single-process local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, OriginalTransactionId};
use crate::domain::subscription::{LifecycleError, Subscription, Transition};
use crate::ports::{SubscriptionRepository, TransitionError, TransitionFn};

#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    rows: Mutex<HashMap<OriginalTransactionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row directly, bypassing the lifecycle.
    pub async fn insert(&self, subscription: Subscription) {
        self.rows
            .lock()
            .await
            .insert(subscription.original_transaction_id.clone(), subscription);
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows.lock().await.get(id).cloned())
    }

    async fn transition(
        &self,
        id: &OriginalTransactionId,
        compute: &TransitionFn<'_>,
    ) -> Result<Transition, TransitionError> {
        let mut rows = self.rows.lock().await;
        let transition = compute(rows.get(id))?;

        match &transition {
            Transition::Create(subscription) => {
                rows.insert(id.clone(), subscription.clone());
            }
            Transition::Update(subscription) => match rows.get_mut(id) {
                Some(row) => *row = subscription.clone(),
                None => return Err(LifecycleError::Orphan(id.clone()).into()),
            },
            Transition::Unchanged { .. } => {}
        }

        Ok(transition)
    }
}
