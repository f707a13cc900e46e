use std::collections::BTreeSet;

use proptest::prelude::*;
use rf2_config::CompositeKeyConfig;
use rf2_core::MemberIdReconciler;
use rf2_model::{ComponentType, Row, TableSchema};

const SIMPLE_MAP: &str = "der2_sRefset_SimpleMapDelta_INT_20250131.txt";
const MODULE: &str = "900000000000207008";
const REFSET: &str = "447562003";

fn schema() -> TableSchema {
    let columns = [
        "id",
        "effectiveTime",
        "active",
        "moduleId",
        "refsetId",
        "referencedComponentId",
        "mapTarget",
    ]
    .map(str::to_string)
    .to_vec();
    TableSchema::new(SIMPLE_MAP, ComponentType::Refset, columns)
}

fn member(effective_time: &str, active: &str, component: u64, target: &str) -> Row {
    vec![
        String::new(),
        effective_time.to_string(),
        active.to_string(),
        MODULE.to_string(),
        REFSET.to_string(),
        component.to_string(),
        target.to_string(),
    ]
}

fn delta(effective_time: &str) -> Vec<Row> {
    (0..20u64)
        .map(|n| member(effective_time, "1", 100_000 + n, &format!("A{n:02}.0")))
        .collect()
}

#[test]
fn first_release_synthesizes_distinct_ids() {
    let schema = schema();
    let keys = CompositeKeyConfig::default();
    let reconciled = MemberIdReconciler::new(&schema, &keys, "20240731")
        .reconcile(None, delta("20240731"))
        .expect("reconcile");
    assert_eq!(reconciled.summary.synthesized, 20);
    let ids: BTreeSet<&str> = reconciled.rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(ids.len(), 20);
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[test]
fn second_release_reuses_every_identifier() {
    let schema = schema();
    let keys = CompositeKeyConfig::default();
    let first = MemberIdReconciler::new(&schema, &keys, "20240731")
        .reconcile(None, delta("20240731"))
        .expect("first release");

    let second = MemberIdReconciler::new(&schema, &keys, "20250131")
        .reconcile(Some(first.rows.as_slice()), delta("20250131"))
        .expect("second release");

    assert_eq!(second.summary.reused_by_fingerprint, 20);
    assert_eq!(second.summary.synthesized, 0);
    let before: Vec<&str> = first.rows.iter().map(|row| row[0].as_str()).collect();
    let after: Vec<&str> = second.rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(before, after);
}

#[test]
fn business_key_match_survives_a_module_move() {
    let schema = schema();
    let keys = CompositeKeyConfig::default();
    let mut previous = vec![member("20240731", "1", 100_000, "A00.0")];
    previous[0][0] = "5b2a0a4e-8d7b-5d0c-9b1e-6f1f0f3d7a10".to_string();

    let mut moved = member("20250131", "0", 100_000, "A00.0");
    moved[3] = "999000011000000103".to_string();
    // SimpleMap members are keyed on referencedComponentId and mapTarget, so
    // a new target is a new member.
    let retargeted = member("20250131", "1", 100_000, "B00.0");

    let reconciled = MemberIdReconciler::new(&schema, &keys, "20250131")
        .reconcile(Some(previous.as_slice()), vec![moved, retargeted])
        .expect("reconcile");
    assert_eq!(reconciled.rows[0][0], "5b2a0a4e-8d7b-5d0c-9b1e-6f1f0f3d7a10");
    assert_eq!(reconciled.summary.reused_by_business_key, 1);
    assert_eq!(reconciled.summary.synthesized, 1);
    assert_ne!(reconciled.rows[1][0], reconciled.rows[0][0]);
}

#[test]
fn inactivation_with_unchanged_content_matches_fingerprint() {
    let schema = schema();
    let keys = CompositeKeyConfig::default();
    let mut previous = vec![member("20240731", "1", 100_000, "A00.0")];
    previous[0][0] = "5b2a0a4e-8d7b-5d0c-9b1e-6f1f0f3d7a10".to_string();

    let reconciled = MemberIdReconciler::new(&schema, &keys, "20250131")
        .reconcile(
            Some(previous.as_slice()),
            vec![member("20250131", "0", 100_000, "A00.0")],
        )
        .expect("reconcile");
    assert_eq!(reconciled.rows[0][0], "5b2a0a4e-8d7b-5d0c-9b1e-6f1f0f3d7a10");
    assert_eq!(reconciled.rows[0][2], "0");
    assert_eq!(reconciled.summary.reused_by_fingerprint, 1);
}

proptest! {
    #[test]
    fn reconciliation_is_idempotent(
        components in prop::collection::btree_set(1u64..1_000_000, 1..40),
        previous_count in 0usize..40,
        flags in prop::collection::vec(any::<bool>(), 40),
    ) {
        let schema = schema();
        let keys = CompositeKeyConfig::default();
        let components: Vec<u64> = components.into_iter().collect();
        let previous: Vec<Row> = components
            .iter()
            .take(previous_count)
            .enumerate()
            .map(|(n, component)| {
                let mut row = member("20240731", if flags[n] { "1" } else { "0" }, *component, "X");
                row[0] = rf2_transform::member_uuid(&row[3..], "20240731").to_string();
                row
            })
            .collect();
        let delta: Vec<Row> = components
            .iter()
            .enumerate()
            .map(|(n, component)| member("20250131", "1", *component, if flags[n] { "X" } else { "Y" }))
            .collect();

        let reconciler = MemberIdReconciler::new(&schema, &keys, "20250131");
        let once = reconciler.reconcile(Some(previous.as_slice()), delta.clone()).unwrap();
        let twice = reconciler.reconcile(Some(previous.as_slice()), delta).unwrap();
        prop_assert_eq!(&once, &twice);

        let ids: BTreeSet<&str> = once.rows.iter().map(|row| row[0].as_str()).collect();
        prop_assert_eq!(ids.len(), once.rows.len());
    }
}
