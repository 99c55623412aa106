use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_examd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn examd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn requests_before_workspace_report_no_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);
    assert!(health["result"]["workspacePath"].is_null());

    for (i, method) in [
        "settings.get",
        "sections.list",
        "students.list",
        "objections.list",
    ]
    .iter()
    .enumerate()
    {
        let resp = request(&mut stdin, &mut reader, &format!("nw{}", i), method, json!({}));
        assert_eq!(error_code(&resp), "no_workspace", "{}", method);
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_method_and_bad_json() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{\"id\":\"x\",\"method\":\"nope.nothing\",\"params\":{{}}}}")
        .expect("write request");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["ok"], false);
    assert_eq!(error_code(&resp), "not_implemented");

    writeln!(stdin, "this is not json").expect("write garbage");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["ok"], false);
    assert_eq!(error_code(&resp), "bad_json");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("examd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy(), "seedDefaults": true }),
    );
    assert_eq!(selected["ok"], true);
    assert_eq!(selected["result"]["seeded"], true);

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("health", json!({})),
        ("settings.get", json!({})),
        ("settings.update", json!({ "announcementText": "مرحبا" })),
        ("certificateTypes.list", json!({})),
        ("sections.list", json!({})),
        ("subjects.list", json!({})),
        ("students.list", json!({})),
        ("students.get", json!({ "studentId": "missing" })),
        ("results.listForStudent", json!({ "studentId": "missing" })),
        ("results.evaluate", json!({ "studentId": "missing" })),
        ("results.lookup", json!({ "subscriptionNumber": "123456" })),
        ("results.delete", json!({ "resultId": "missing" })),
        ("import.rows", json!({ "rows": [] })),
        ("import.table", json!({ "headers": [], "rows": [] })),
        ("objections.list", json!({})),
        ("backup.export", json!({ "outPath": bundle_out.to_string_lossy() })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let _ = request(&mut stdin, &mut reader, &format!("s{}", i), method, params);
    }

    let sections = request(&mut stdin, &mut reader, "2", "sections.list", json!({}));
    assert_eq!(
        sections["result"]["sections"]
            .as_array()
            .map(|a| a.len())
            .unwrap_or(0),
        6
    );
    assert!(bundle_out.is_file());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
