use super::*;

#[test]
fn deal_id_parses_trimmed_integer() {
    let id: DealId = " 1824 ".parse().unwrap();
    assert_eq!(id, DealId::new(1824));
    assert_eq!(id.to_string(), "1824");
}

#[test]
fn deal_id_rejects_negative_and_text() {
    assert!("-1".parse::<DealId>().is_err());
    assert!("abc".parse::<DealId>().is_err());
}

#[test]
fn ids_serialise_as_bare_integers() {
    let json = serde_json::to_value(StageId::new(5)).unwrap();
    assert_eq!(json, serde_json::json!(5));
}

#[test]
fn company_domain_is_normalised_to_lowercase() {
    let domain = CompanyDomain::new("  AcmeCorp ").unwrap();
    assert_eq!(domain.as_str(), "acmecorp");
}

#[test]
fn company_domain_rejects_invalid_labels() {
    assert!(CompanyDomain::new("").is_none());
    assert!(CompanyDomain::new("acme.pipedrive.com").is_none());
    assert!(CompanyDomain::new("-acme").is_none());
    assert!(CompanyDomain::new("ac me").is_none());
}

#[test]
fn relay_ids_are_unique() {
    assert_ne!(RelayId::new_random(), RelayId::new_random());
}
