//! Pipedrive CRM infrastructure adapter.
//!
//! Implements the [`relay::CrmSource`] trait over the Pipedrive v1 REST API:
//!
//! ```text
//! GET {base}/api/v1/{deals|persons|organizations|users}/{id}?api_token={token}
//! ```
//!
//! Every response is wrapped in an envelope, `{"success": true, "data": {...}}`
//! or `{"success": false, "data": null, "error": "..."}`. This crate unwraps it
//! and reports everything that is not a non-empty `data` object as a
//! [`relay::CrmError`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, URL building, envelope decoding and
//! `Retry-After` parsing live here. Retrying does not: one
//! [`relay::CrmSource::fetch_record`] call is exactly one request, and the
//! schedule is owned by [`relay::DealRelay`].
//!
//! The API token travels as a query parameter, so it is stripped from every
//! error message before the message leaves this crate.

mod client;
mod envelope;

pub use client::{PipedriveClient, PipedriveError};
