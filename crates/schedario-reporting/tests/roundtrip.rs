use std::collections::BTreeMap;

use schedario_core::{CanonicalMapping, Entry, VolumeId};
use schedario_reporting::{
    diff_mappings, read_flat_mapping, write_mapping, ExportFormat, ReportError,
};

fn mapping(entries: Vec<Entry>) -> CanonicalMapping {
    CanonicalMapping::new(
        entries
            .into_iter()
            .map(|e| (e.headword.clone(), e))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn written_mapping_reads_back_and_diffs_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedario.json");
    let m = mapping(vec![
        Entry::definition(VolumeId(1), "babbà", "dolce napoletano."),
        Entry::alias(VolumeId(2), "ac", "acqua"),
    ]);

    write_mapping(&m, ExportFormat::Flat, &path).unwrap();
    let read = read_flat_mapping(&path).unwrap();
    assert_eq!(read, m.to_flat());
    assert!(diff_mappings(&read, &m.to_flat()).is_empty());

    let bytes = std::fs::read_to_string(&path).unwrap();
    assert!(bytes.contains("\"babbà\""), "non-ASCII headwords are written verbatim");
}

#[test]
fn rewrite_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.json");
    let second = dir.path().join("b.json");
    let m = mapping(vec![
        Entry::definition(VolumeId(1), "mare", "sea."),
        Entry::definition(VolumeId(1), "acqua", "water."),
    ]);
    write_mapping(&m, ExportFormat::Detailed, &first).unwrap();
    write_mapping(&m, ExportFormat::Detailed, &second).unwrap();
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn diff_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.json");
    let old = mapping(vec![
        Entry::definition(VolumeId(1), "acqua", "water."),
        Entry::alias(VolumeId(1), "pummarola", "pomodoro"),
    ]);
    write_mapping(&old, ExportFormat::Flat, &path).unwrap();

    let new = mapping(vec![
        Entry::definition(VolumeId(1), "acqua", "water."),
        Entry::definition(VolumeId(1), "pummarola", "tomato"),
        Entry::definition(VolumeId(2), "pomodoro", "tomato (fruit)"),
    ]);
    let diff = diff_mappings(&read_flat_mapping(&path).unwrap(), &new.to_flat());
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.added[0].0, "pomodoro");
    assert!(diff.removed.is_empty());
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].old, "v. pomodoro");
    assert_eq!(diff.changed[0].new, "tomato");
}

#[test]
fn malformed_file_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(read_flat_mapping(&path), Err(ReportError::Json(_))));
}
