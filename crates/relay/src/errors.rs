//! Error types for the relay domain.
//!
//! [`RelayError`] covers the two ways a matched stage transition can fail to
//! reach the destination: the deal could not be fetched, or the composed
//! document could not be delivered. The port-level errors ([`CrmError`],
//! [`DeliveryError`]) are produced by the infrastructure adapters and carry
//! enough detail for logging and for the retry loop.
//!
//! Every [`CrmError`] is retried by [`crate::retry::retry_fetch`]; a
//! [`DeliveryError`] never is.

use std::time::Duration;

use thiserror::Error;

use crate::DealId;

/// Longest response body excerpt kept in an error.
pub const BODY_EXCERPT_LIMIT: usize = 512;

/// Shortens a response body for inclusion in an error, on a char boundary.
pub fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.len() <= BODY_EXCERPT_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

// ---------------------------------------------------------------------------
// CRM read errors
// ---------------------------------------------------------------------------

/// Failure of a single CRM read request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CrmError {
    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("CRM request failed: {message}")]
    Transport {
        /// Transport-level error description.
        message: String,
        /// `true` when the configured request timeout elapsed.
        timed_out: bool,
    },

    /// The CRM answered with a non-success HTTP status.
    #[error("CRM responded with HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
        /// Parsed `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// The body was not a JSON envelope, or the record lacked a usable `id`.
    #[error("CRM response was malformed: {message}")]
    MalformedResponse {
        /// Description of what was wrong with the body.
        message: String,
    },

    /// The envelope was well-formed but `data` was null or empty.
    #[error("CRM returned no data: {}", .error.as_deref().unwrap_or("no error message"))]
    NoData {
        /// The envelope's `error` field, when present.
        error: Option<String>,
    },
}

impl CrmError {
    /// The server's `Retry-After` hint, if the failure carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if the CRM reported that the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Failure of the single POST to the destination webhook.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    /// The destination answered with a non-2xx status.
    #[error("destination responded with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("destination request failed: {message}")]
    Transport {
        /// Transport-level error description.
        message: String,
        /// `true` when the delivery timeout elapsed.
        timed_out: bool,
    },
}

// ---------------------------------------------------------------------------
// Relay-level errors
// ---------------------------------------------------------------------------

/// Errors that end a matched relay without a successful delivery.
///
/// Nothing is persisted on failure: the inbound event is dropped once the
/// caller has been told.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The deal could not be fetched within the retry budget.
    #[error("fetching deal {deal_id} failed after {attempts} attempt(s): {last}")]
    FetchFailed {
        /// The deal that was being fetched.
        deal_id: DealId,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: CrmError,
    },

    /// The composed document was rejected by or could not reach the destination.
    #[error("delivering deal {deal_id} failed: {source}")]
    DeliveryFailed {
        /// The deal whose document was being delivered.
        deal_id: DealId,
        /// The delivery failure.
        #[source]
        source: DeliveryError,
    },
}

impl RelayError {
    /// Returns the deal the failed relay was about.
    pub fn deal_id(&self) -> DealId {
        match self {
            Self::FetchFailed { deal_id, .. } | Self::DeliveryFailed { deal_id, .. } => *deal_id,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
