#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("examd-backup-src");
    let workspace2 = temp_dir("examd-backup-dst");
    let out_dir = temp_dir("examd-backup-out");

    let bytes = b"sqlite-test-payload";
    std::fs::write(workspace.join("results.sqlite3"), bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest_text = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest_text)
        .expect("read manifest");
    let manifest: backup::Manifest = serde_json::from_str(&manifest_text).expect("manifest json");
    assert_eq!(manifest.format, backup::BUNDLE_FORMAT);
    assert_eq!(manifest.db_sha256, export.db_sha256);
    archive
        .by_name("db/results.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(import.exported_at, manifest.exported_at);

    let restored = std::fs::read(workspace2.join("results.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);
    assert!(!workspace2.join("results.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_database_is_rejected() {
    let out_dir = temp_dir("examd-backup-tampered");
    let workspace = temp_dir("examd-backup-tampered-dst");
    std::fs::write(workspace.join("results.sqlite3"), b"keep-me").expect("write existing db");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = FileOptions::default();
        let manifest = backup::Manifest {
            format: backup::BUNDLE_FORMAT.to_string(),
            app_version: "0.0.0".to_string(),
            exported_at: "2025-07-01T00:00:00+00:00".to_string(),
            db_sha256: "0".repeat(64),
        };
        zip.start_file("manifest.json", opts).expect("start manifest");
        zip.write_all(serde_json::to_string(&manifest).expect("manifest").as_bytes())
            .expect("write manifest");
        zip.start_file("db/results.sqlite3", opts).expect("start db");
        zip.write_all(b"not-what-the-manifest-says").expect("write db");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("checksum");
    assert!(err.to_string().contains("checksum"));
    let kept = std::fs::read(workspace.join("results.sqlite3")).expect("read existing db");
    assert_eq!(kept, b"keep-me");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn foreign_bundle_format_is_rejected() {
    let out_dir = temp_dir("examd-backup-foreign");
    let workspace = temp_dir("examd-backup-foreign-dst");

    let bundle_path = out_dir.join("foreign.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        zip.start_file("manifest.json", FileOptions::default())
            .expect("start manifest");
        zip.write_all(
            br#"{"format":"something-else","appVersion":"1","exportedAt":"x","dbSha256":""}"#,
        )
        .expect("write manifest");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("format");
    assert!(err.to_string().contains("unsupported bundle format"));

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
