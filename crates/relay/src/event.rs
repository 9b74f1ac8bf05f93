//! Inbound Pipedrive change notifications.
//!
//! The canonical payload is the Pipedrive v1 webhook shape with top-level
//! `current` and `previous` objects:
//!
//! ```json
//! {"event": "updated.deal", "current": {"id": 1824, "stage_id": 5}, "previous": {"stage_id": 4}}
//! ```
//!
//! Other legacy shapes (`data.current`, `meta.entity_id`) are not accepted.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{DealId, StageId};

/// Why an inbound payload was rejected as malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    /// The body is not JSON.
    #[error("body is not valid JSON: {message}")]
    InvalidJson {
        /// Parser error description.
        message: String,
    },

    /// The body is JSON but not an object.
    #[error("body must be a JSON object")]
    NotAnObject,

    /// A required top-level section is absent or not an object.
    #[error("missing required object `{section}`")]
    MissingSection {
        /// `"current"` or `"previous"`.
        section: &'static str,
    },

    /// A section has no integer `stage_id`.
    #[error("`{section}.stage_id` is missing or not an integer")]
    InvalidStageId {
        /// `"current"` or `"previous"`.
        section: &'static str,
    },

    /// A matched event has no integer `current.id`.
    #[error("`current.id` is missing or not a positive integer")]
    InvalidDealId,
}

/// One stage-change notification, reduced to the fields the relay reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTransitionEvent {
    /// `current.id`; only required once the transition is known to match.
    pub deal_id: Option<DealId>,
    /// `previous.stage_id`
    pub previous_stage: StageId,
    /// `current.stage_id`
    pub current_stage: StageId,
    /// The optional `event` label, e.g. `"updated.deal"`.
    pub event: Option<String>,
}

impl StageTransitionEvent {
    /// Parses and validates a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| EventError::InvalidJson {
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Validates an already decoded payload.
    ///
    /// Both sections are checked for presence before either stage id is read,
    /// so a payload lacking `previous` is reported as such even when
    /// `current.stage_id` is also broken.
    pub fn from_value(value: &Value) -> Result<Self, EventError> {
        let root = value.as_object().ok_or(EventError::NotAnObject)?;

        let current = section(root, "current")?;
        let previous = section(root, "previous")?;

        let previous_stage = stage_id(previous, "previous")?;
        let current_stage = stage_id(current, "current")?;

        let deal_id = current
            .get("id")
            .and_then(Value::as_u64)
            .filter(|id| *id > 0)
            .map(DealId::new);

        let event = root
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            deal_id,
            previous_stage,
            current_stage,
            event,
        })
    }
}

fn section<'a>(
    root: &'a serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<&'a serde_json::Map<String, Value>, EventError> {
    root.get(name)
        .and_then(Value::as_object)
        .ok_or(EventError::MissingSection { section: name })
}

fn stage_id(
    section: &serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<StageId, EventError> {
    section
        .get("stage_id")
        .and_then(Value::as_u64)
        .map(StageId::new)
        .ok_or(EventError::InvalidStageId { section: name })
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
