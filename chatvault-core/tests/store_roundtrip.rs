use chatvault_core::error::VaultError;
use chatvault_core::manifest::{FileRecord, PartRef};
use chatvault_core::store::ManifestStore;
use std::fs;

fn record(id: &str, orders: &[u32]) -> FileRecord {
    FileRecord {
        id: id.into(),
        chat_target: "me".into(),
        file_path: "/tmp/source.bin".into(),
        size: 42,
        created_utc: "2026-01-01T00:00:00+00:00".into(),
        parts: orders
            .iter()
            .map(|&o| PartRef {
                order: o,
                message_id: o as i64 * 10,
                file_path: format!("/tmp/source.bin.part{o}"),
                len: 14,
                hash_hex: None,
            })
            .collect(),
    }
}

#[test]
fn append_then_fresh_open_sees_the_record() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");

    let mut store = ManifestStore::open(&path).unwrap();
    store.append(record("abc-123", &[1, 2, 3])).unwrap();

    let reopened = ManifestStore::open(&path).unwrap();
    let rec = reopened.find_by_id("abc-123").expect("record survives reload");
    assert_eq!(rec.parts.len(), 3);
    assert_eq!(rec.parts.iter().map(|p| p.order).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(rec.parts[1].message_id, 20);
}

#[test]
fn open_of_missing_path_is_empty() {
    let td = tempfile::tempdir().unwrap();
    let store = ManifestStore::open(&td.path().join("uploads.json")).unwrap();
    assert!(store.records().is_empty());
}

#[test]
fn zero_length_file_is_empty() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");
    fs::write(&path, "").unwrap();
    let store = ManifestStore::open(&path).unwrap();
    assert!(store.records().is_empty());
}

#[test]
fn garbage_document_is_corrupt() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");
    fs::write(&path, "{not json").unwrap();
    let err = ManifestStore::open(&path).unwrap_err();
    assert!(matches!(err, VaultError::CorruptManifest { .. }), "got {err:?}");
}

#[test]
fn order_gap_is_corrupt() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");
    fs::write(
        &path,
        r#"{"files":[{"id":"x","chat_target":"me","file_path":"f.bin","parts":[
            {"order":1,"message_id":5,"file_path":"f.bin.part1"},
            {"order":3,"message_id":6,"file_path":"f.bin.part3"}]}]}"#,
    )
    .unwrap();
    let err = ManifestStore::open(&path).unwrap_err();
    assert!(matches!(err, VaultError::CorruptManifest { .. }), "got {err:?}");
}

#[test]
fn minimal_document_without_extension_fields_loads() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");
    fs::write(
        &path,
        r#"{"files":[{"id":"x","chat_target":"me","file_path":"f.bin","parts":[
            {"order":1,"message_id":5,"file_path":"f.bin.part1"}]}]}"#,
    )
    .unwrap();
    let store = ManifestStore::open(&path).unwrap();
    let rec = store.find_by_id("x").unwrap();
    assert_eq!(rec.size, 0);
    assert!(rec.parts[0].hash_hex.is_none());
}

#[test]
fn append_rejects_empty_parts() {
    let td = tempfile::tempdir().unwrap();
    let mut store = ManifestStore::open(&td.path().join("uploads.json")).unwrap();
    let err = store.append(record("empty", &[])).unwrap_err();
    assert!(matches!(err, VaultError::InvalidArgument(_)), "got {err:?}");
    assert!(store.records().is_empty());
}

#[test]
fn append_rejects_out_of_order_parts() {
    let td = tempfile::tempdir().unwrap();
    let mut store = ManifestStore::open(&td.path().join("uploads.json")).unwrap();
    let err = store.append(record("dup", &[1, 1, 2])).unwrap_err();
    assert!(matches!(err, VaultError::InvalidArgument(_)), "got {err:?}");
}

#[test]
fn find_by_id_unknown_is_none() {
    let td = tempfile::tempdir().unwrap();
    let mut store = ManifestStore::open(&td.path().join("uploads.json")).unwrap();
    store.append(record("present", &[1])).unwrap();
    assert!(store.find_by_id("absent").is_none());
}

#[test]
fn appends_accumulate_in_order() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("uploads.json");

    let mut store = ManifestStore::open(&path).unwrap();
    store.append(record("first", &[1])).unwrap();
    store.append(record("second", &[1, 2])).unwrap();

    let reopened = ManifestStore::open(&path).unwrap();
    let ids: Vec<&str> = reopened.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}
