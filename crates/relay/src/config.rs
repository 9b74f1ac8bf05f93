//! Process-wide relay configuration.
//!
//! Loaded once at start-up through [`RelayConfig::from_lookup`], which takes a
//! variable lookup function instead of reading the environment itself. The
//! binary passes `std::env::var`; tests pass a map.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{CompanyDomain, RetrySchedule, StageId, StageTransition};

/// Environment variable names.
pub mod vars {
    /// Stage the deal must leave.
    pub const SOURCE_STAGE_ID: &str = "RELAY_SOURCE_STAGE_ID";
    /// Stage the deal must enter.
    pub const TARGET_STAGE_ID: &str = "RELAY_TARGET_STAGE_ID";
    /// Where composed documents are POSTed.
    pub const DESTINATION_URL: &str = "RELAY_DESTINATION_URL";
    /// Pipedrive API token.
    pub const API_TOKEN: &str = "PIPEDRIVE_API_TOKEN";
    /// Pipedrive company subdomain.
    pub const COMPANY_DOMAIN: &str = "PIPEDRIVE_COMPANY_DOMAIN";
    /// Overrides `https://{domain}.pipedrive.com`.
    pub const BASE_URL: &str = "PIPEDRIVE_BASE_URL";
    /// Whether to resolve person, organization and creator.
    pub const ENRICH: &str = "RELAY_ENRICH";
    /// Listener socket address.
    pub const BIND_ADDR: &str = "RELAY_BIND_ADDR";
    /// Total CRM fetch attempts.
    pub const FETCH_ATTEMPTS: &str = "RELAY_FETCH_ATTEMPTS";
    /// First back-off delay in milliseconds.
    pub const FETCH_BASE_DELAY_MS: &str = "RELAY_FETCH_BASE_DELAY_MS";
    /// Per-request CRM timeout in seconds.
    pub const CRM_TIMEOUT_SECS: &str = "RELAY_CRM_TIMEOUT_SECS";
    /// Delivery timeout in seconds.
    pub const DELIVERY_TIMEOUT_SECS: &str = "RELAY_DELIVERY_TIMEOUT_SECS";
}

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default per-request CRM timeout.
pub const DEFAULT_CRM_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounds the delivery timeout is clamped to.
pub const DELIVERY_TIMEOUT_RANGE: (Duration, Duration) =
    (Duration::from_secs(5), Duration::from_secs(15));

const MAX_FETCH_ATTEMPTS: u32 = 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A configuration value is missing or unusable. Always fatal at start-up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("required configuration `{var}` is not set")]
    Missing {
        /// Variable name.
        var: &'static str,
    },

    /// A variable is set but cannot be used.
    #[error("configuration `{var}` is invalid: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Secrets and URLs
// ---------------------------------------------------------------------------

/// The Pipedrive API token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wraps a token, returning `None` if it is blank.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token: String = token.into();
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// Returns the raw token for use in a request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// An absolute `http` or `https` URL with a host.
///
/// `Debug` and [`HttpUrl::origin`] never include userinfo, path or query; only
/// [`HttpUrl::as_str`] returns the full URL, for use as a request target.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpUrl(Url);

impl HttpUrl {
    /// Parses `value`, requiring an `http` or `https` scheme and a host.
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        let url = Url::parse(value).map_err(|e| format!("`{value}` is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("`{value}` must start with http:// or https://"));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(format!("`{value}` has no host"));
        }
        Ok(Self(url))
    }

    /// The full URL, credentials included.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Scheme, host and explicit port only. Safe to log.
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }
}

impl std::fmt::Debug for HttpUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HttpUrl").field(&self.origin()).finish()
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How to reach the Pipedrive API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmSettings {
    /// Company subdomain.
    pub domain: CompanyDomain,
    /// API token.
    pub api_token: ApiToken,
    /// API origin; `https://{domain}.pipedrive.com` unless overridden.
    pub base_url: HttpUrl,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Where and how to deliver composed documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSettings {
    /// Destination webhook.
    pub url: HttpUrl,
    /// Request timeout, within [`DELIVERY_TIMEOUT_RANGE`].
    pub timeout: Duration,
}

/// Immutable relay configuration, shared read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// The one transition that triggers a relay.
    pub transition: StageTransition,
    /// CRM access.
    pub crm: CrmSettings,
    /// Destination webhook.
    pub destination: DestinationSettings,
    /// CRM fetch retry schedule.
    pub retry: RetrySchedule,
    /// Resolve person, organization and creator into the document.
    pub enrich: bool,
    /// Listener address.
    pub bind_addr: SocketAddr,
}

impl RelayConfig {
    /// Builds the configuration from a variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| -> Option<String> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |var: &'static str| get(var).ok_or(ConfigError::Missing { var });

        let source = parse_stage(vars::SOURCE_STAGE_ID, &require(vars::SOURCE_STAGE_ID)?)?;
        let target = parse_stage(vars::TARGET_STAGE_ID, &require(vars::TARGET_STAGE_ID)?)?;

        let destination_url = HttpUrl::parse(&require(vars::DESTINATION_URL)?)
            .map_err(|reason| invalid(vars::DESTINATION_URL, reason))?;

        let api_token = ApiToken::new(require(vars::API_TOKEN)?)
            .ok_or(ConfigError::Missing { var: vars::API_TOKEN })?;

        let domain_raw = require(vars::COMPANY_DOMAIN)?;
        let domain = CompanyDomain::new(domain_raw.as_str()).ok_or_else(|| {
            invalid(
                vars::COMPANY_DOMAIN,
                format!("`{domain_raw}` is not a subdomain (expected e.g. `acme`, not `acme.pipedrive.com`)"),
            )
        })?;

        let base_url = match get(vars::BASE_URL) {
            Some(raw) => HttpUrl::parse(&raw).map_err(|reason| invalid(vars::BASE_URL, reason))?,
            None => HttpUrl::parse(&format!("https://{domain}.pipedrive.com"))
                .map_err(|reason| invalid(vars::COMPANY_DOMAIN, reason))?,
        };

        let enrich = match get(vars::ENRICH) {
            Some(raw) => parse_bool(vars::ENRICH, &raw)?,
            None => true,
        };

        let bind_raw = get(vars::BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid(vars::BIND_ADDR, format!("`{bind_raw}`: {e}")))?;

        let max_attempts = match get(vars::FETCH_ATTEMPTS) {
            Some(raw) => {
                let n = parse_u64(vars::FETCH_ATTEMPTS, &raw)?;
                if n == 0 || n > u64::from(MAX_FETCH_ATTEMPTS) {
                    return Err(invalid(
                        vars::FETCH_ATTEMPTS,
                        format!("must be between 1 and {MAX_FETCH_ATTEMPTS}, got {n}"),
                    ));
                }
                n as u32
            }
            None => crate::retry::DEFAULT_MAX_ATTEMPTS,
        };
        let base_delay = match get(vars::FETCH_BASE_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_u64(vars::FETCH_BASE_DELAY_MS, &raw)?),
            None => crate::retry::DEFAULT_BASE_DELAY,
        };

        let crm_timeout = match get(vars::CRM_TIMEOUT_SECS) {
            Some(raw) => positive_secs(vars::CRM_TIMEOUT_SECS, &raw)?,
            None => DEFAULT_CRM_TIMEOUT,
        };
        let delivery_timeout = match get(vars::DELIVERY_TIMEOUT_SECS) {
            Some(raw) => clamp_delivery_timeout(positive_secs(vars::DELIVERY_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_DELIVERY_TIMEOUT,
        };

        Ok(Self {
            transition: StageTransition::new(source, target),
            crm: CrmSettings {
                domain,
                api_token,
                base_url,
                timeout: crm_timeout,
            },
            destination: DestinationSettings {
                url: destination_url,
                timeout: delivery_timeout,
            },
            retry: RetrySchedule::new(max_attempts, base_delay),
            enrich,
            bind_addr,
        })
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|_| invalid(var, format!("`{raw}` is not a non-negative integer")))
}

fn parse_stage(var: &'static str, raw: &str) -> Result<StageId, ConfigError> {
    parse_u64(var, raw).map(StageId::new)
}

fn positive_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match parse_u64(var, raw)? {
        0 => Err(invalid(var, "must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, format!("`{raw}` is not a boolean"))),
    }
}

fn clamp_delivery_timeout(requested: Duration) -> Duration {
    let (min, max) = DELIVERY_TIMEOUT_RANGE;
    let clamped = requested.clamp(min, max);
    if clamped != requested {
        warn!(
            requested_secs = requested.as_secs(),
            applied_secs = clamped.as_secs(),
            "delivery timeout outside the supported range; clamped"
        );
    }
    clamped
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
