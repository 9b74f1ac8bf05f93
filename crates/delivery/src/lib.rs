//! Destination webhook adapter.
//!
//! Implements the [`relay::DeliveryTarget`] trait: the composed deal document
//! is POSTed once, as JSON, to the configured URL.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Only transport lives here. A non-2xx answer or a
//! transport failure becomes a [`relay::DeliveryError`]; nothing is retried,
//! since the destination (typically an automation platform hook) may already
//! have acted on a request whose response was lost.

use async_trait::async_trait;
use relay::{
    excerpt, DeliveryError, DeliveryReceipt, DeliveryTarget, DestinationSettings, HttpUrl,
};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Failure to construct a [`WebhookDelivery`].
#[derive(Debug, Error)]
pub enum DeliverySetupError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build delivery HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// POSTs documents to a single destination URL.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    http: reqwest::Client,
    url: HttpUrl,
}

impl WebhookDelivery {
    /// Builds a delivery client with the configured timeout.
    pub fn new(settings: &DestinationSettings) -> Result<Self, DeliverySetupError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("pipedrive-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DeliverySetupError::ClientBuild)?;
        Ok(Self {
            http,
            url: settings.url.clone(),
        })
    }

}

#[async_trait]
impl DeliveryTarget for WebhookDelivery {
    #[instrument(skip_all, fields(destination = %self.url.origin()))]
    async fn deliver(&self, document: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .http
            .post(self.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(document)
            .send()
            .await
            .map_err(|err| {
                let timed_out = err.is_timeout();
                let err = err.without_url();
                warn!(timed_out, error = %err, "destination unreachable");
                DeliveryError::Transport {
                    message: err.to_string(),
                    timed_out,
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "destination accepted document");
            return Ok(DeliveryReceipt {
                status: status.as_u16(),
            });
        }

        // An unreadable body still yields the status error.
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "destination rejected document");
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body: excerpt(&body),
        })
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
