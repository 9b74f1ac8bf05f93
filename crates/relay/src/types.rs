//! Shared value types for the relay domain.
//!
//! CRM records are loosely typed: Pipedrive accounts carry custom fields whose
//! keys are opaque hashes, so a [`DealRecord`] keeps the full JSON object and
//! exposes typed accessors only for the handful of fields the relay reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CrmError, DealId, OrganizationId, PersonId, UserId};

/// A JSON object as returned by the CRM.
pub type RecordFields = Map<String, Value>;

// ---------------------------------------------------------------------------
// Record kinds
// ---------------------------------------------------------------------------

/// The CRM collections the relay reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `/deals/{id}`
    Deal,
    /// `/persons/{id}`
    Person,
    /// `/organizations/{id}`
    Organization,
    /// `/users/{id}`
    User,
}

impl RecordKind {
    /// Path segment of the collection in the Pipedrive v1 API.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Deal => "deals",
            Self::Person => "persons",
            Self::Organization => "organizations",
            Self::User => "users",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Deal => "deal",
            Self::Person => "person",
            Self::Organization => "organization",
            Self::User => "user",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Deal record
// ---------------------------------------------------------------------------

/// A Pipedrive deal as returned by `GET /deals/{id}`.
///
/// The only enforced invariant is a positive integer `id`; every other field
/// passes through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct DealRecord {
    id: DealId,
    fields: RecordFields,
}

impl DealRecord {
    /// Builds a record from the envelope's `data` value.
    ///
    /// Null and empty objects are reported as [`CrmError::NoData`]; anything
    /// else that is not an object with a positive integer `id` is
    /// [`CrmError::MalformedResponse`].
    pub fn from_value(value: Value) -> Result<Self, CrmError> {
        let fields = match value {
            Value::Null => return Err(CrmError::NoData { error: None }),
            Value::Object(map) if map.is_empty() => return Err(CrmError::NoData { error: None }),
            Value::Object(map) => map,
            other => {
                return Err(CrmError::MalformedResponse {
                    message: format!("expected a deal object, got {}", json_kind(&other)),
                })
            }
        };

        let id = fields
            .get("id")
            .and_then(Value::as_u64)
            .filter(|id| *id > 0)
            .ok_or_else(|| CrmError::MalformedResponse {
                message: "deal record has no positive integer `id`".to_string(),
            })?;

        Ok(Self {
            id: DealId::new(id),
            fields,
        })
    }

    /// The deal's identifier.
    pub fn id(&self) -> DealId {
        self.id
    }

    /// The linked contact person, if any.
    pub fn person_id(&self) -> Option<PersonId> {
        reference_id(self.fields.get("person_id")).map(PersonId::new)
    }

    /// The linked organization, if any.
    pub fn organization_id(&self) -> Option<OrganizationId> {
        reference_id(self.fields.get("org_id")).map(OrganizationId::new)
    }

    /// The user who created the deal.
    ///
    /// Pipedrive stores the creator in `creator_user_id`; older payloads only
    /// carry the owner in `user_id`, which is used as a fallback.
    pub fn creator_user_id(&self) -> Option<UserId> {
        reference_id(self.fields.get("creator_user_id"))
            .or_else(|| reference_id(self.fields.get("user_id")))
            .map(UserId::new)
    }

    /// All fields of the record.
    pub fn fields(&self) -> &RecordFields {
        &self.fields
    }
}

/// Resolves a Pipedrive reference field.
///
/// Depending on the endpoint and API version a reference is either a bare
/// integer or an object such as `{"value": 12, "name": "..."}` (persons,
/// organizations) or `{"id": 3, "name": "...", "value": 3}` (users).
fn reference_id(value: Option<&Value>) -> Option<u64> {
    let id = match value? {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => obj
            .get("value")
            .and_then(Value::as_u64)
            .or_else(|| obj.get("id").and_then(Value::as_u64)),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Composed document
// ---------------------------------------------------------------------------

/// Sub-records resolved from a deal's links.
///
/// Each relation is an empty object when the deal has no such link or the
/// lookup failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
    /// The linked person.
    pub person: RecordFields,
    /// The linked organization.
    pub organization: RecordFields,
    /// The deal's creator.
    pub creator_user: RecordFields,
}

/// The document forwarded to the destination webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDeal {
    deal: DealRecord,
    relations: Option<Relations>,
}

impl EnrichedDeal {
    /// A document made of the deal alone.
    pub fn bare(deal: DealRecord) -> Self {
        Self {
            deal,
            relations: None,
        }
    }

    /// A document made of the deal plus its resolved relations.
    pub fn with_relations(deal: DealRecord, relations: Relations) -> Self {
        Self {
            deal,
            relations: Some(relations),
        }
    }

    /// The deal's identifier.
    pub fn deal_id(&self) -> DealId {
        self.deal.id()
    }

    /// Renders the outbound JSON body.
    ///
    /// The deal's own fields come first, unchanged; relations are added under
    /// `person`, `organization` and `creator_user`, replacing any deal field
    /// of the same name.
    pub fn to_document(&self) -> Value {
        let mut doc = self.deal.fields().clone();
        if let Some(relations) = &self.relations {
            doc.insert("person".into(), Value::Object(relations.person.clone()));
            doc.insert(
                "organization".into(),
                Value::Object(relations.organization.clone()),
            );
            doc.insert(
                "creator_user".into(),
                Value::Object(relations.creator_user.clone()),
            );
        }
        Value::Object(doc)
    }
}

// ---------------------------------------------------------------------------
// Delivery results
// ---------------------------------------------------------------------------

/// What the destination answered to a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// The 2xx status returned by the destination.
    pub status: u16,
}

/// Summary of a completed relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayReceipt {
    /// The relayed deal.
    pub deal_id: DealId,
    /// Number of CRM attempts needed to fetch the deal.
    pub fetch_attempts: u32,
    /// Destination status code.
    pub destination_status: u16,
    /// When the destination accepted the document.
    pub delivered_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
