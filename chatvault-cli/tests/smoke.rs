use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::process::Command;

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

fn chatvault() -> Command {
    Command::cargo_bin("chatvault").unwrap()
}

#[test]
fn upload_list_download_flow() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data.bin");
    write_random(data.path(), 150 * 1024, 1);

    // upload prints the manifest record as JSON; the id is the handle
    let out = chatvault()
        .current_dir(td.path())
        .args(["--max-part-size", "64K", "upload", "data.bin"])
        .output()
        .unwrap();
    assert!(out.status.success(), "upload failed: {}", String::from_utf8_lossy(&out.stderr));
    let record: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let id = record["id"].as_str().unwrap().to_string();
    assert_eq!(record["parts"].as_array().unwrap().len(), 3);

    chatvault()
        .current_dir(td.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));

    chatvault()
        .current_dir(td.path())
        .args(["--max-part-size", "64K", "download", &id, "--output", "restored.bin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored.bin"));

    let original = std::fs::read(data.path()).unwrap();
    let restored = std::fs::read(td.path().join("restored.bin")).unwrap();
    assert_eq!(original, restored);
}

#[test]
fn roundtrip_prints_ok() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data.bin");
    write_random(data.path(), 150 * 1024, 2);

    chatvault()
        .current_dir(td.path())
        .args(["--max-part-size", "64K", "roundtrip", "data.bin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    // The source is untouched by the verification pass
    assert_eq!(std::fs::read(data.path()).unwrap().len(), 150 * 1024);
}

#[test]
fn download_of_unknown_id_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    chatvault()
        .current_dir(td.path())
        .args(["download", "not-a-real-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no uploaded file"));
}

#[test]
fn split_helper_writes_parts() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data.bin");
    write_random(data.path(), 100 * 1024, 3);

    chatvault()
        .current_dir(td.path())
        .args(["--max-part-size", "32K", "split", "data.bin", "parts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data.bin.part4"));

    let count = std::fs::read_dir(td.path().join("parts")).unwrap().count();
    assert_eq!(count, 4);
}
