use std::fs;
use std::path::Path;

use rf2_config::{BuildConfiguration, load_build_configuration};
use rf2_model::{CheckStage, ReleaseKind};
use rf2_validate::{
    PackagedFile, check_postconditions, check_preconditions, gate_release,
    write_validation_report_json,
};

const CONCEPT_HEADER: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\r\n";

fn config(dir: &Path, tables: &[&str]) -> BuildConfiguration {
    let mut manifest = String::from(
        "[release]\nproduct = \"Test Edition\"\neffective_time = \"20250131\"\nfirst_time_release = true\n",
    );
    for table in tables {
        manifest.push_str(&format!("\n[[tables]]\ninput = \"{table}\"\n"));
    }
    let path = dir.join("manifest.toml");
    fs::write(&path, manifest).expect("write manifest");
    load_build_configuration(&path).expect("load manifest")
}

fn codes(report: &rf2_model::ValidationReport) -> Vec<&str> {
    report.issues.iter().map(|issue| issue.code.as_str()).collect()
}

#[test]
fn clean_inputs_pass() {
    let root = tempfile::tempdir().expect("temp dir");
    let input = root.path().join("input");
    fs::create_dir(&input).expect("input dir");
    fs::write(input.join("rel2_Concept_Delta_INT_20250131.txt"), CONCEPT_HEADER).expect("write");

    let config = config(root.path(), &["rel2_Concept_Delta_INT_20250131.txt"]);
    let report = check_preconditions(&config, &input).expect("check");
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert!(!gate_release(&[report], false).block_release);
}

#[test]
fn input_problems_are_reported() {
    let root = tempfile::tempdir().expect("temp dir");
    let input = root.path().join("input");
    fs::create_dir(&input).expect("input dir");
    fs::write(input.join("rel2_Concept_Delta_INT_20250131.txt"), "").expect("write");
    fs::write(
        input.join("rel2_Description_Delta-en_INT_20250131.txt"),
        "id\teffectiveTime\tactive\r\n",
    )
    .expect("write");
    fs::write(input.join("rel2_TextDefinition_Delta-en_INT_20250131.txt"), "").expect("write");

    let config = config(
        root.path(),
        &[
            "rel2_Concept_Delta_INT_20250131.txt",
            "rel2_Description_Delta-en_INT_20250131.txt",
            "rel2_StatedRelationship_Delta_INT_20250131.txt",
            "rel2_Refset_SimpleDelta_INT_20240731.txt",
            "rel2_Concept_Delta_INT_20250131.txt",
        ],
    );
    let report = check_preconditions(&config, &input).expect("check");
    assert_eq!(
        codes(&report),
        vec![
            "PRE_EMPTY_INPUT",
            "PRE_HEADER_WIDTH",
            "PRE_MISSING_INPUT",
            "PRE_FILE_DATE",
            "PRE_MISSING_INPUT",
            "PRE_DUPLICATE_INPUT",
            "PRE_UNLISTED_INPUT",
        ]
    );
    assert_eq!(report.warning_count(), 1);

    let decision = gate_release(&[report.clone()], false);
    assert!(decision.block_release);
    assert_eq!(decision.blocking_stages, vec![CheckStage::Precondition]);
    assert!(!gate_release(&[report], true).block_release);
}

#[test]
fn packaged_files_are_checked() {
    let dir = tempfile::tempdir().expect("temp dir");
    let full = dir.path().join("sct2_Concept_Full_INT_20250131.txt");
    let snapshot = dir.path().join("sct2_Concept_Snapshot_INT_20250131.txt");
    let delta = dir.path().join("sct2_Concept_Delta_INT_20250131.txt");
    fs::write(&full, format!("{CONCEPT_HEADER}1\t20250131\t1\tm\tp\r\n")).expect("write");
    fs::write(
        &snapshot,
        format!("{CONCEPT_HEADER}1\t20250131\t1\tm\tp\r\n1\t20240731\t1\tm\tp\r\n"),
    )
    .expect("write");
    fs::write(&delta, "id\teffectiveTime\tactive\tmoduleId\r\n1\t20240731\t1\tm\r\n").expect("write");

    let table = "rel2_Concept_Delta_INT_20250131.txt".to_string();
    let files = vec![
        PackagedFile { table: table.clone(), kind: ReleaseKind::Full, path: full },
        PackagedFile { table: table.clone(), kind: ReleaseKind::Snapshot, path: snapshot },
        PackagedFile { table: table.clone(), kind: ReleaseKind::Delta, path: delta },
        PackagedFile {
            table: "rel2_Refset_SimpleDelta_INT_20250131.txt".to_string(),
            kind: ReleaseKind::Delta,
            path: dir.path().join("der2_Refset_SimpleDelta_INT_20250131.txt"),
        },
    ];
    let report = check_postconditions("20250131", &files).expect("check");
    assert_eq!(
        codes(&report),
        vec![
            "POST_SNAPSHOT_DUPLICATE_ID",
            "POST_DELTA_EFFECTIVE_TIME",
            "POST_HEADER_MISMATCH",
            "POST_SNAPSHOT_LARGER_THAN_FULL",
            "POST_MISSING_OUTPUT",
        ]
    );

    let path = write_validation_report_json(dir.path(), "Test Edition", "20250131", &[report])
        .expect("write report");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).expect("read report")).expect("json");
    assert_eq!(json["reports"][0]["stage"], "postcondition");
    assert_eq!(json["reports"][0]["error_count"], 5);
}

#[test]
fn derivative_needs_namespace_and_module() {
    let root = tempfile::tempdir().expect("temp dir");
    let input = root.path().join("input");
    fs::create_dir(&input).expect("input dir");
    fs::write(input.join("rel2_Concept_Delta_INT_20250131.txt"), CONCEPT_HEADER).expect("write");

    let mut config = config(root.path(), &["rel2_Concept_Delta_INT_20250131.txt"]);
    config.derivative = true;
    let report = check_preconditions(&config, &input).expect("check");
    assert_eq!(
        codes(&report),
        vec!["PRE_DERIVATIVE_NAMESPACE", "PRE_DERIVATIVE_MODULE"]
    );
    assert!(gate_release(&[report], false).block_release);

    config.namespace = Some("1000052".to_string());
    config.module_id = Some("45991000052106".to_string());
    let report = check_preconditions(&config, &input).expect("check");
    assert!(report.issues.is_empty(), "{:?}", report.issues);
}
