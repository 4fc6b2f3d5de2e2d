//! Subscription repository port.
//!
//! The only write path to subscription state. Writes go through
//! `transition`, which runs the pure lifecycle computation against the
//! current row while holding that row's write lock, so two notifications
//! for the same original transaction id never interleave.
//!
//! # Example
//!
//! ```ignore
//! let outcome = repo
//!     .transition(&event.original_transaction_id, &|current| {
//!         lifecycle::apply(&policy, &event, &plan, current, now)
//!     })
//!     .await?;
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, OriginalTransactionId};
use crate::domain::subscription::{LifecycleError, Subscription, Transition};

/// Lifecycle computation run under the per-key lock.
pub type TransitionFn<'a> =
    dyn Fn(Option<&Subscription>) -> Result<Transition, LifecycleError> + Send + Sync + 'a;

/// Failure of a locked transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The computation rejected the event, or an update matched no row.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Repository port for Subscription persistence.
///
/// Implementations must ensure:
/// - One row per original transaction id
/// - `compute` observes the latest committed row and no concurrent writer
///   for the same key runs until the write commits
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by original transaction id.
    ///
    /// Returns `None` if no `SUBSCRIBED` notification has been applied yet.
    async fn find(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Compute and persist a transition atomically.
    ///
    /// - `Create` upserts on the original transaction id
    /// - `Update` conditionally updates the existing row; no matching row is
    ///   reported as `LifecycleError::Orphan`
    /// - `Unchanged` writes nothing
    ///
    /// # Errors
    ///
    /// - `Lifecycle` when `compute` fails or the row disappeared
    /// - `Storage` on database failure
    async fn transition(
        &self,
        id: &OriginalTransactionId,
        compute: &TransitionFn<'_>,
    ) -> Result<Transition, TransitionError>;
}
