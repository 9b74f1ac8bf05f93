use async_trait::async_trait;
use relay::{
    excerpt, ApiToken, CrmError, CrmSettings, CrmSource, HttpUrl, RecordFields, RecordKind,
};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::envelope::{decode_record, parse_retry_after};

/// Failure to construct a [`PipedriveClient`].
#[derive(Debug, Error)]
pub enum PipedriveError {
    /// The underlying HTTP client could not be built (e.g. TLS backend init).
    #[error("failed to build Pipedrive HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Read-only client for single Pipedrive records.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct PipedriveClient {
    http: reqwest::Client,
    base_url: HttpUrl,
    api_token: ApiToken,
}

impl std::fmt::Debug for PipedriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipedriveClient")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token)
            .finish_non_exhaustive()
    }
}

impl PipedriveClient {
    /// Builds a client with the configured per-request timeout.
    pub fn new(settings: &CrmSettings) -> Result<Self, PipedriveError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("pipedrive-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PipedriveError::ClientBuild)?;
        Ok(Self::with_client(http, settings))
    }

    /// Wraps an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, settings: &CrmSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url.clone(),
            api_token: settings.api_token.clone(),
        }
    }

    /// The record URL without credentials.
    pub fn record_url(&self, kind: RecordKind, id: u64) -> String {
        format!(
            "{}/api/v1/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            kind.collection(),
            id
        )
    }
}

#[async_trait]
impl CrmSource for PipedriveClient {
    #[instrument(skip(self), fields(crm = %self.base_url.origin()))]
    async fn fetch_record(&self, kind: RecordKind, id: u64) -> Result<RecordFields, CrmError> {
        let response = self
            .http
            .get(self.record_url(kind, id))
            .query(&[("api_token", self.api_token.expose())])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "CRM responded");

        if !status.is_success() {
            return Err(CrmError::Status {
                status: status.as_u16(),
                body: excerpt(&String::from_utf8_lossy(&body)),
                retry_after,
            });
        }

        decode_record(&body)
    }
}

/// Converts a reqwest error, dropping the URL because it carries the token.
fn transport_error(err: reqwest::Error) -> CrmError {
    let timed_out = err.is_timeout();
    CrmError::Transport {
        message: err.without_url().to_string(),
        timed_out,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
