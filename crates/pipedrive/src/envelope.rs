//! Decoding of the Pipedrive response envelope.

use std::time::Duration;

use relay::{CrmError, RecordFields};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes a 2xx body into the `data` object.
pub(crate) fn decode_record(body: &[u8]) -> Result<RecordFields, CrmError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| CrmError::MalformedResponse {
            message: format!("response is not a Pipedrive envelope: {e}"),
        })?;

    match envelope.data {
        Value::Null => Err(CrmError::NoData {
            error: envelope.error,
        }),
        Value::Object(map) if map.is_empty() => Err(CrmError::NoData {
            error: envelope.error,
        }),
        Value::Object(map) => Ok(map),
        _ => Err(CrmError::MalformedResponse {
            message: "envelope `data` is not an object".to_string(),
        }),
    }
}

/// Parses a `Retry-After` header given in seconds. HTTP-date values are ignored.
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}
