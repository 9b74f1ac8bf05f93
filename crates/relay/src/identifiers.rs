//! Newtype domain identifiers.
//!
//! Every Pipedrive entity the relay touches is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`DealId`] with a [`StageId`] even though both are `u64` on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (Pipedrive-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display, FromStr.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: Pipedrive-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a Pipedrive deal.
    DealId
}

u64_id! {
    /// Identifies a pipeline stage within Pipedrive.
    ///
    /// Stage ids are global to the company account, so a pair of them fully
    /// describes a transition regardless of which pipeline the deal lives in.
    StageId
}

u64_id! {
    /// Identifies a Pipedrive person (contact) linked from a deal.
    PersonId
}

u64_id! {
    /// Identifies a Pipedrive organization linked from a deal.
    OrganizationId
}

u64_id! {
    /// Identifies a Pipedrive user, e.g. the creator of a deal.
    UserId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single relay invocation (one inbound webhook or one CLI run).
///
/// Generated fresh per request and attached to the tracing span and the
/// response body so a caller can correlate a response with the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(Uuid);

impl RelayId {
    /// Generates a new random relay identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RelayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration)
// ---------------------------------------------------------------------------

/// The Pipedrive company subdomain, i.e. `acme` in `acme.pipedrive.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyDomain(String);

impl CompanyDomain {
    /// Creates a company domain, returning `None` if the value is empty or is
    /// not a valid DNS label (ASCII alphanumerics and `-`).
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let raw: String = value.into();
        let v = raw.trim().to_ascii_lowercase();
        let valid = !v.is_empty()
            && !v.starts_with('-')
            && !v.ends_with('-')
            && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the subdomain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CompanyDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;
