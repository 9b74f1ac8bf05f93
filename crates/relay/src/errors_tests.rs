use std::time::Duration;

use super::*;

#[test]
fn crm_status_exposes_retry_after() {
    let err = CrmError::Status {
        status: 429,
        body: String::new(),
        retry_after: Some(Duration::from_secs(2)),
    };
    assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
}

#[test]
fn crm_no_data_has_no_retry_hint() {
    let err = CrmError::NoData { error: None };
    assert_eq!(err.retry_after(), None);
    assert_eq!(err.to_string(), "CRM returned no data: no error message");
}

#[test]
fn crm_not_found_is_detected_only_for_404() {
    let not_found = CrmError::Status {
        status: 404,
        body: "Deal not found".into(),
        retry_after: None,
    };
    let server_error = CrmError::Status {
        status: 500,
        body: String::new(),
        retry_after: None,
    };
    assert!(not_found.is_not_found());
    assert!(!server_error.is_not_found());
    assert!(!CrmError::NoData { error: None }.is_not_found());
}

#[test]
fn excerpt_truncates_on_char_boundary() {
    let long = "é".repeat(400);
    let short = excerpt(&long);
    assert!(short.ends_with('…'));
    assert!(short.len() <= BODY_EXCERPT_LIMIT + '…'.len_utf8());
    assert_eq!(excerpt("  short  "), "short");
}

#[test]
fn delivery_rejection_display_includes_status() {
    let err = DeliveryError::Rejected {
        status: 503,
        body: "busy".into(),
    };
    assert_eq!(err.to_string(), "destination responded with HTTP 503: busy");
}

#[test]
fn relay_error_reports_deal_id() {
    let err = RelayError::FetchFailed {
        deal_id: DealId::new(7),
        attempts: 3,
        last: CrmError::NoData {
            error: Some("Deal not found".into()),
        },
    };
    assert_eq!(err.deal_id(), DealId::new(7));
    assert_eq!(
        err.to_string(),
        "fetching deal 7 failed after 3 attempt(s): CRM returned no data: Deal not found"
    );
}
