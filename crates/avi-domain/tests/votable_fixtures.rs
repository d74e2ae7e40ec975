use avi_domain::{analyze, VoTable, VoTableError};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

#[test]
fn reads_vizier_style_counts() {
    let table = VoTable::from_path(&fixture("counts_tabledata.vot")).expect("fixture parses");
    assert_eq!(table.colnames(), vec!["ra_floor", "dec_floor", "nb"]);
    assert_eq!(table.len(), 6);
    assert_eq!(table.fields[2].ucd.as_deref(), Some("meta.number"));
    assert!(table.infos.iter().any(|i| i.name == "QUERY_STATUS" && i.value == "OK"));
    assert_eq!(table.column_f64("nb").unwrap(), vec![4.0, 2.0, 7.0, 1.0, 3.0, 5.0]);
}

#[test]
fn analysis_over_fixture_sorts_points_by_count() {
    let table = VoTable::from_path(&fixture("counts_tabledata.vot")).unwrap();
    let out = analyze(&table).unwrap();
    assert_eq!(out.n_points, 6);

    let json: serde_json::Value = serde_json::from_slice(&out.figure.to_json().unwrap()).unwrap();
    let rows = json["data"]["data01"].as_array().unwrap();
    let counts: Vec<f64> = rows.iter().map(|r| r[2].as_f64().unwrap()).collect();
    assert_eq!(counts, vec![1.0, 2.0, 3.0, 4.0, 5.0, 7.0]);
    // el punto de mayor conteo es (1, -1)
    assert_eq!(rows[5][0].as_f64(), Some(1.0));
    assert_eq!(rows[5][1].as_f64(), Some(-1.0));
}

#[test]
fn query_error_document_is_rejected() {
    let err = VoTable::from_path(&fixture("query_error.vot")).unwrap_err();
    match err {
        VoTableError::QueryError(msg) => assert!(msg.contains("I/999/nothing")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let err = VoTable::from_path(&fixture("does_not_exist.vot")).unwrap_err();
    assert!(matches!(err, VoTableError::Io(_)));
}
