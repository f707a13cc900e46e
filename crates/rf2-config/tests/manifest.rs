use std::io::Write;

use rf2_config::{ConfigError, load_build_configuration};
use rf2_model::ReleaseKind;

fn write_manifest(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp manifest");
    file.write_all(contents.as_bytes()).expect("write manifest");
    file
}

#[test]
fn loads_full_manifest() {
    let file = write_manifest(
        r#"
[release]
product = "SNOMED CT International Edition"
effective_time = "20250131"
namespace = "INT"
workbench_data_fixes = true
previous_release = "previous"

[[tables]]
input = "rel2_Concept_Delta_INT_20250131.txt"

[[tables]]
input = "rel2_Refset_SimpleDelta_INT_20250131.txt"
outputs = ["snapshot", "delta"]

[module_fix]
model_module_id = "900000000000012004"

[composite_keys]
"447562003" = [5, 7, 10]

[reconciliation]
snapshot_active_only = true
"#,
    );

    let config = load_build_configuration(file.path()).expect("load config");
    assert_eq!(config.effective_time.as_str(), "20250131");
    assert!(config.workbench_data_fixes);
    assert_eq!(config.tables.len(), 2);
    assert_eq!(config.tables[0].outputs, ReleaseKind::ALL.to_vec());
    assert!(!config.tables[1].wants(ReleaseKind::Full));
    assert_eq!(
        config.composite_keys.columns_for("447562003"),
        Some(&[5, 7, 10][..])
    );
    assert!(config.reconciliation.enabled);
    assert!(config.reconciliation.snapshot_active_only);
    assert!(config.reconciliation.discard_already_published);
    assert_eq!(config.module_ids.is_a_type_id, "116680003");
}

#[test]
fn rejects_bad_effective_time() {
    let file = write_manifest(
        r#"
[release]
product = "Test"
effective_time = "20251301"
"#,
    );
    assert!(matches!(
        load_build_configuration(file.path()),
        Err(ConfigError::InvalidEffectiveTime { .. })
    ));
}

#[test]
fn reports_toml_errors_with_path() {
    let file = write_manifest("[release\nproduct = 1");
    let err = load_build_configuration(file.path()).expect_err("invalid toml");
    assert!(matches!(err, ConfigError::Toml { .. }));
    assert!(err.to_string().contains("failed to parse TOML manifest"));
}

#[test]
fn derivative_module_is_read_and_trimmed() {
    let file = write_manifest(
        r#"
[release]
product = "Example Derivative"
effective_time = "20250131"
namespace = "1000052"
derivative = true
module_id = " 45991000052106 "
first_time_release = true
"#,
    );
    let config = load_build_configuration(file.path()).expect("load config");
    assert!(config.derivative);
    assert_eq!(config.module_id.as_deref(), Some("45991000052106"));
    assert_eq!(config.namespace.as_deref(), Some("1000052"));
}
