//! Inbound webhook receiver.
//!
//! Binds an HTTP server that accepts Pipedrive change notifications, validates
//! them, and hands matching stage transitions to [`relay::DealRelay`].
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/webhook` | Pipedrive notification |
//! | `POST` | `/pipedrive-webhook` | Alias of `/webhook` |
//! | `GET` | `/health` | Liveness probe |
//!
//! ## Responses
//!
//! Every webhook response is a JSON object with a `status` field and the
//! `relay_id` of the request:
//!
//! | HTTP | `status` | When |
//! |------|----------|------|
//! | 200 | `success` | Deal fetched and delivered |
//! | 200 | `ignored` | Not the configured transition |
//! | 400 | `malformed` | Not JSON, missing `current`/`previous`, bad stage or deal id |
//! | 404 | `fetch failed` | CRM kept answering 404 for the deal |
//! | 500 | `fetch failed` | CRM fetch exhausted its retries |
//! | 502 | `delivery failed` | Destination rejected or unreachable |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP framing and status mapping live here; the filter
//! and the fetch-and-forward flow live in [`relay`].

mod handlers;
mod router;

pub use handlers::WebhookResponse;
pub use router::{build_router, serve, ListenerError, MAX_BODY_BYTES};
