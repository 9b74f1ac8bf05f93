//! Port traits implemented by the infrastructure crates.
//!
//! | Trait | Implemented by |
//! |-------|----------------|
//! | [`CrmSource`] | `pipedrive::PipedriveClient` |
//! | [`DeliveryTarget`] | `delivery::WebhookDelivery` |
//! | [`Sleeper`] | [`TokioSleeper`] (tests use an instant fake) |

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CrmError, DeliveryError, DeliveryReceipt, RecordFields, RecordKind};

/// Read access to single CRM records.
///
/// One call is one HTTP request: implementations must not retry internally,
/// the relay owns the retry schedule.
#[async_trait]
pub trait CrmSource: Send + Sync {
    /// Fetches the record `id` of collection `kind`.
    ///
    /// Returns the envelope's `data` object. A null or empty `data` is
    /// [`CrmError::NoData`].
    async fn fetch_record(&self, kind: RecordKind, id: u64) -> Result<RecordFields, CrmError>;
}

/// The destination webhook.
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    /// POSTs `document` once. Any non-2xx answer is an error.
    async fn deliver(&self, document: &Value) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Waits between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
