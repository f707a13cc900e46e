use std::collections::BTreeSet;

use proptest::prelude::*;
use rf2_core::{ExportRequest, MemoryTableStore, TableStore, write_table, write_table_file};
use rf2_model::{ReleaseKind, Row};

const TABLE: &str = "sct2_Concept_Delta_INT_20250131.txt";
const HEADER: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\r\n";

fn store_with(rows: &[(u64, String)]) -> MemoryTableStore {
    let mut input = String::from(HEADER);
    for (id, effective_time) in rows {
        input.push_str(&format!(
            "{id}\t{effective_time}\t1\t900000000000207008\t900000000000074008\r\n"
        ));
    }
    let mut store = MemoryTableStore::new();
    store
        .create_table(TABLE, &mut input.as_bytes(), true)
        .expect("create table");
    store
}

fn effective_time() -> impl Strategy<Value = String> {
    (2002u32..2030, 1u32..13, 1u32..29).prop_map(|(y, m, d)| format!("{y:04}{m:02}{d:02}"))
}

proptest! {
    #[test]
    fn select_full_is_strictly_increasing(
        keys in prop::collection::btree_set((1u64..u64::MAX, effective_time()), 0..64)
    ) {
        let mut rows: Vec<(u64, String)> = keys.into_iter().collect();
        rows.reverse();
        let store = store_with(&rows);
        let full: Vec<(u64, String)> = store
            .select_full(TABLE)
            .unwrap()
            .map(|row: Row| (row[0].parse().unwrap(), row[1].clone()))
            .collect();
        prop_assert_eq!(full.len(), rows.len());
        prop_assert!(full.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn snapshot_has_one_row_per_released_id(
        keys in prop::collection::btree_set((1u64..500, effective_time()), 1..64)
    ) {
        let rows: Vec<(u64, String)> = keys.into_iter().collect();
        let store = store_with(&rows);
        let as_of = "20160101";
        let expected: BTreeSet<u64> = rows
            .iter()
            .filter(|(_, et)| et.as_str() <= as_of)
            .map(|(id, _)| *id)
            .collect();
        let snapshot: Vec<Row> = store.select_snapshot(TABLE, as_of, false).unwrap().collect();
        let ids: BTreeSet<u64> = snapshot.iter().map(|row| row[0].parse().unwrap()).collect();
        prop_assert_eq!(ids.len(), snapshot.len());
        prop_assert_eq!(ids, expected);
    }
}

#[test]
fn views_are_written_with_crlf() {
    let store = store_with(&[
        (100, "20240731".to_string()),
        (100, "20250131".to_string()),
        (200, "20250131".to_string()),
    ]);
    let mut out = Vec::new();
    let written = write_table(
        &store,
        TABLE,
        ExportRequest {
            kind: ReleaseKind::Delta,
            effective_time: "20250131",
            snapshot_active_only: false,
        },
        &mut out,
    )
    .expect("write");
    assert_eq!(written, 2);
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with(HEADER));
    insta::assert_snapshot!(text.replace("\r\n", "\n"), @r"
    id	effectiveTime	active	moduleId	definitionStatusId
    100	20250131	1	900000000000207008	900000000000074008
    200	20250131	1	900000000000207008	900000000000074008
    ");
}

#[test]
fn snapshot_file_replaces_atomically() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sct2_Concept_Snapshot_INT_20250131.txt");
    let store = store_with(&[(100, "20240731".to_string()), (100, "20250131".to_string())]);
    let request = ExportRequest {
        kind: ReleaseKind::Snapshot,
        effective_time: "20250131",
        snapshot_active_only: false,
    };
    assert_eq!(write_table_file(&store, TABLE, request, &path).expect("export"), 1);
    let text = std::fs::read_to_string(&path).expect("read");
    assert_eq!(text.lines().count(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 1);
}
