//! Exchange client abstraction consumed by workers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{SyncError, SyncJob, SyncWindow};
use crate::util::serde::{JobId, SyncType};

/// One step of a job handed to the exchange client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Job the step belongs to.
    pub job_id: JobId,
    /// Connection (credential) to sync.
    pub connection_id: String,
    /// Owning user.
    pub user_id: String,
    /// Exchange identifier.
    pub exchange_name: String,
    /// Data kind to fetch.
    pub sync_type: SyncType,
    /// Time window.
    pub options: SyncWindow,
}

impl SyncRequest {
    /// Build the request for one sync type of `job`.
    #[must_use]
    pub fn for_job(job: &SyncJob, sync_type: SyncType) -> Self {
        Self {
            job_id: job.id(),
            connection_id: job.connection_id().to_string(),
            user_id: job.user_id().to_string(),
            exchange_name: job.exchange_name().to_string(),
            sync_type,
            options: job.options(),
        }
    }
}

/// What the client reports after fetching and persisting one sync type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Records fetched and persisted.
    pub items_processed: u64,
}

impl SyncOutcome {
    /// Outcome with the given record count.
    #[must_use]
    pub const fn items(items_processed: u64) -> Self {
        Self { items_processed }
    }
}

/// Abstraction over an exchange API client.
///
/// The client fetches the requested data and persists it itself; the
/// scheduler only records how many items were processed. Implementations
/// should watch `cancel` and return `SyncError::Cancelled` promptly once it
/// fires. The scheduler abandons the call on timeout or cancellation either
/// way, but a cooperative client stops issuing requests against the
/// exchange's rate limit.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use exchange_sync_scheduler::core::{ExchangeClient, SyncError, SyncOutcome, SyncRequest};
/// use tokio_util::sync::CancellationToken;
///
/// struct BinanceClient { /* http client, credentials store */ }
///
/// #[async_trait]
/// impl ExchangeClient for BinanceClient {
///     async fn sync(
///         &self,
///         request: SyncRequest,
///         cancel: CancellationToken,
///     ) -> Result<SyncOutcome, SyncError> {
///         let fetched = self.fetch_and_store(&request, &cancel).await?;
///         Ok(SyncOutcome::items(fetched))
///     }
/// }
/// ```
#[async_trait]
pub trait ExchangeClient: Send + Sync + 'static {
    /// Fetch and persist one sync type for one connection.
    ///
    /// # Errors
    ///
    /// Any `SyncError`; it is recorded in the step's `SyncResult` and the
    /// job moves on to its next sync type.
    async fn sync(
        &self,
        request: SyncRequest,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError>;
}

#[async_trait]
impl<C> ExchangeClient for Arc<C>
where
    C: ExchangeClient + ?Sized,
{
    async fn sync(
        &self,
        request: SyncRequest,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        (**self).sync(request, cancel).await
    }
}
