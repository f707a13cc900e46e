use proptest::prelude::*;
use rf2_model::{BuildStatus, IdType, Key, ValidationIssue, ValidationReport};
use rf2_model::conformance::CheckStage;

proptest! {
    #[test]
    fn numeric_key_round_trips(id in 0u64..=u64::MAX, date in "(19|20)[0-9]{2}(0[1-9]|1[0-2])(0[1-9]|[12][0-9])") {
        let key = Key::from_columns(IdType::Sctid, &id.to_string(), &date).expect("valid key");
        let parsed = Key::parse(IdType::Sctid, &key.format()).expect("round trip");
        prop_assert_eq!(parsed, key);
    }

    #[test]
    fn numeric_order_matches_integer_order(a in any::<u64>(), b in any::<u64>()) {
        let ka = Key::from_columns(IdType::Sctid, &a.to_string(), "20200131").expect("key a");
        let kb = Key::from_columns(IdType::Sctid, &b.to_string(), "20200131").expect("key b");
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }
}

#[test]
fn opaque_key_round_trips() {
    let key = Key::from_columns(
        IdType::Uuid,
        "8c1b2b1e-2f60-5b3a-9d84-7e2f4c6a1b00",
        "20250131",
    )
    .expect("valid key");
    assert_eq!(key.format(), "8c1b2b1e-2f60-5b3a-9d84-7e2f4c6a1b00\t20250131");
    assert_eq!(
        Key::parse(IdType::Uuid, &key.format()).expect("round trip"),
        key
    );
}

#[test]
fn build_status_serializes_screaming_case() {
    let json = serde_json::to_string(&BuildStatus::BeforeTrigger).expect("serialize");
    assert_eq!(json, "\"BEFORE_TRIGGER\"");
}

#[test]
fn report_counts_by_severity() {
    let mut report = ValidationReport::new(CheckStage::Precondition);
    report.add(ValidationIssue::error("PRE_EMPTY_INPUT", "empty file").with_table("a.txt"));
    report.add(ValidationIssue::warning("PRE_UNKNOWN_INPUT", "not in manifest"));
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.warning_count(), 1);
    assert!(report.has_errors());
}
