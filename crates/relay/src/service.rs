//! The fetch-and-forward flow.
//!
//! [`DealRelay`] ties the configured [`StageTransition`] to the two outbound
//! ports. It owns no mutable state; one instance is shared by every request.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::retry::{retry_fetch, Exhausted};
use crate::{
    CrmSource, DealId, DealRecord, DeliveryTarget, EnrichedDeal, EventError, RecordFields,
    RecordKind, RelayConfig, RelayError, RelayReceipt, Relations, RetrySchedule, Sleeper,
    StageTransition, StageTransitionEvent, Timestamp, TokioSleeper, TransitionDecision,
};

/// What happened to an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The event is not the configured transition; nothing was fetched or sent.
    Ignored,
    /// The deal was fetched and delivered.
    Delivered(RelayReceipt),
}

/// Why an inbound event could not be relayed.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The event matched but lacks a usable deal id.
    #[error(transparent)]
    Malformed(#[from] EventError),
    /// Fetching or delivering failed.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Stage filter plus fetch-and-forward.
pub struct DealRelay {
    transition: StageTransition,
    retry: RetrySchedule,
    enrich: bool,
    crm: Arc<dyn CrmSource>,
    destination: Arc<dyn DeliveryTarget>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for DealRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealRelay")
            .field("transition", &self.transition)
            .field("retry", &self.retry)
            .field("enrich", &self.enrich)
            .finish_non_exhaustive()
    }
}

impl DealRelay {
    /// Creates a relay from the configuration and the two outbound ports.
    ///
    /// Back-off waits use the tokio timer; see [`DealRelay::with_sleeper`].
    pub fn new(
        config: &RelayConfig,
        crm: Arc<dyn CrmSource>,
        destination: Arc<dyn DeliveryTarget>,
    ) -> Self {
        Self {
            transition: config.transition,
            retry: config.retry,
            enrich: config.enrich,
            crm,
            destination,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the back-off sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Filters `event` and, if it is the configured transition, relays its deal.
    pub async fn handle_event(
        &self,
        event: &StageTransitionEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        match self.transition.evaluate(event)? {
            TransitionDecision::Ignore => {
                debug!(
                    previous_stage = %event.previous_stage,
                    current_stage = %event.current_stage,
                    expected = %self.transition,
                    "stage transition ignored"
                );
                Ok(WebhookOutcome::Ignored)
            }
            TransitionDecision::Relay(deal_id) => {
                info!(%deal_id, transition = %self.transition, "stage transition matched");
                let receipt = self.relay_deal(deal_id).await?;
                Ok(WebhookOutcome::Delivered(receipt))
            }
        }
    }

    /// Fetches `deal_id` and forwards it, bypassing the stage filter.
    ///
    /// The delivery is attempted exactly once; a delivery failure never
    /// triggers another fetch.
    #[instrument(skip_all, fields(deal_id = %deal_id))]
    pub async fn relay_deal(&self, deal_id: DealId) -> Result<RelayReceipt, RelayError> {
        let (document, fetch_attempts) = self.compose(deal_id).await?;

        let receipt = self
            .destination
            .deliver(&document.to_document())
            .await
            .map_err(|source| {
                warn!(error = %source, "delivery failed");
                RelayError::DeliveryFailed { deal_id, source }
            })?;

        info!(status = receipt.status, fetch_attempts, "deal delivered");
        Ok(RelayReceipt {
            deal_id,
            fetch_attempts,
            destination_status: receipt.status,
            delivered_at: Timestamp::now(),
        })
    }

    /// Fetches the deal with retry and, if enabled, resolves its relations.
    ///
    /// Returns the document and the number of attempts the deal fetch took.
    pub async fn compose(&self, deal_id: DealId) -> Result<(EnrichedDeal, u32), RelayError> {
        let deal = self.fetch_deal(deal_id).await?;
        let attempts = deal.attempts;
        let deal = deal.value;

        if !self.enrich {
            return Ok((EnrichedDeal::bare(deal), attempts));
        }
        let relations = self.fetch_relations(&deal).await;
        Ok((EnrichedDeal::with_relations(deal, relations), attempts))
    }

    async fn fetch_deal(
        &self,
        deal_id: DealId,
    ) -> Result<crate::retry::Attempted<DealRecord>, RelayError> {
        let context = format!("deal {deal_id}");
        retry_fetch(&self.retry, self.sleeper.as_ref(), &context, |attempt| async move {
            debug!(%deal_id, attempt, "fetching deal");
            let fields = self.crm.fetch_record(RecordKind::Deal, deal_id.as_u64()).await?;
            DealRecord::from_value(serde_json::Value::Object(fields))
        })
        .await
        .map_err(|Exhausted { last, attempts }| RelayError::FetchFailed {
            deal_id,
            attempts,
            last,
        })
    }

    async fn fetch_relations(&self, deal: &DealRecord) -> Relations {
        let (person, organization, creator_user) = tokio::join!(
            self.fetch_related(RecordKind::Person, deal.person_id().map(|id| id.as_u64())),
            self.fetch_related(
                RecordKind::Organization,
                deal.organization_id().map(|id| id.as_u64())
            ),
            self.fetch_related(RecordKind::User, deal.creator_user_id().map(|id| id.as_u64())),
        );
        Relations {
            person,
            organization,
            creator_user,
        }
    }

    /// Single-attempt lookup; any failure degrades to an empty record.
    async fn fetch_related(&self, kind: RecordKind, id: Option<u64>) -> RecordFields {
        let Some(id) = id else {
            debug!(%kind, "deal has no linked record");
            return RecordFields::new();
        };
        match self.crm.fetch_record(kind, id).await {
            Ok(fields) => fields,
            Err(err) => {
                warn!(%kind, id, error = %err, "related record lookup failed; using empty record");
                RecordFields::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
