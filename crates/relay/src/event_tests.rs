use serde_json::json;

use super::*;

#[test]
fn parses_canonical_payload() {
    let body = br#"{"event":"updated.deal","current":{"id":1824,"stage_id":5,"title":"x"},"previous":{"stage_id":4}}"#;
    let event = StageTransitionEvent::parse(body).unwrap();
    assert_eq!(
        event,
        StageTransitionEvent {
            deal_id: Some(DealId::new(1824)),
            previous_stage: StageId::new(4),
            current_stage: StageId::new(5),
            event: Some("updated.deal".into()),
        }
    );
}

#[test]
fn rejects_invalid_json() {
    assert!(matches!(
        StageTransitionEvent::parse(b"{not json"),
        Err(EventError::InvalidJson { .. })
    ));
}

#[test]
fn rejects_non_object_body() {
    assert_eq!(
        StageTransitionEvent::from_value(&json!([1])),
        Err(EventError::NotAnObject)
    );
}

#[test]
fn rejects_missing_sections() {
    assert_eq!(
        StageTransitionEvent::from_value(&json!({"previous": {"stage_id": 4}})),
        Err(EventError::MissingSection { section: "current" })
    );
    assert_eq!(
        StageTransitionEvent::from_value(&json!({"current": {"id": 1, "stage_id": 5}})),
        Err(EventError::MissingSection {
            section: "previous"
        })
    );
    assert_eq!(
        StageTransitionEvent::from_value(&json!({"current": null, "previous": {"stage_id": 4}})),
        Err(EventError::MissingSection { section: "current" })
    );
}

#[test]
fn legacy_nested_shape_is_not_accepted() {
    let legacy = json!({"data": {"current": {"id": 1, "stage_id": 5}, "previous": {"stage_id": 4}}});
    assert_eq!(
        StageTransitionEvent::from_value(&legacy),
        Err(EventError::MissingSection { section: "current" })
    );
}

#[test]
fn rejects_missing_or_non_integer_stage_ids() {
    assert_eq!(
        StageTransitionEvent::from_value(&json!({"current": {"id": 1, "stage_id": 5}, "previous": {}})),
        Err(EventError::InvalidStageId {
            section: "previous"
        })
    );
    assert_eq!(
        StageTransitionEvent::from_value(
            &json!({"current": {"id": 1, "stage_id": "5"}, "previous": {"stage_id": 4}})
        ),
        Err(EventError::InvalidStageId { section: "current" })
    );
    assert_eq!(
        StageTransitionEvent::from_value(
            &json!({"current": {"id": 1, "stage_id": 5.5}, "previous": {"stage_id": 4}})
        ),
        Err(EventError::InvalidStageId { section: "current" })
    );
}

#[test]
fn deal_id_is_optional_at_parse_time() {
    let event = StageTransitionEvent::from_value(
        &json!({"current": {"stage_id": 3}, "previous": {"stage_id": 4}}),
    )
    .unwrap();
    assert_eq!(event.deal_id, None);
    assert_eq!(event.event, None);
}
