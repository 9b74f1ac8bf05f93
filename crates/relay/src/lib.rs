//! Core domain for the Pipedrive stage relay.
//!
//! This crate contains every domain concept the relay works with: inbound
//! stage-change events, the single configured transition, deal records and the
//! composed outbound document, the retry schedule, configuration, and the port
//! traits the infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** HTTP transport lives elsewhere:
//!
//! | Crate | Role |
//! |-------|------|
//! | `pipedrive` | [`CrmSource`] over the Pipedrive v1 REST API |
//! | `delivery` | [`DeliveryTarget`] over an HTTP POST |
//! | `listener` | inbound webhook endpoint driving [`DealRelay`] |
//! | `cli` | composition root |
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`DealId`, `StageId`, etc.) |
//! | [`event`] | Inbound payload validation |
//! | [`transition`] | The stage-transition allow-list |
//! | [`types`] | Deal records, composed documents, receipts |
//! | [`retry`] | Bounded exponential back-off |
//! | [`config`] | Start-up configuration |
//! | [`ports`] | Traits implemented by infrastructure crates |
//! | [`service`] | [`DealRelay`], the fetch-and-forward flow |
//! | [`errors`] | Error types |

pub mod config;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod ports;
pub mod retry;
pub mod service;
pub mod transition;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    ApiToken, ConfigError, CrmSettings, DestinationSettings, HttpUrl, RelayConfig,
};
pub use errors::{excerpt, CrmError, DeliveryError, RelayError};
pub use event::{EventError, StageTransitionEvent};
pub use identifiers::{CompanyDomain, DealId, OrganizationId, PersonId, RelayId, StageId, UserId};
pub use ports::{CrmSource, DeliveryTarget, Sleeper, TokioSleeper};
pub use retry::RetrySchedule;
pub use service::{DealRelay, WebhookError, WebhookOutcome};
pub use transition::{StageTransition, TransitionDecision};
pub use types::{
    DealRecord, DeliveryReceipt, EnrichedDeal, RecordFields, RecordKind, RelayReceipt, Relations,
    Timestamp,
};
