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

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn create(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let created = request_ok(stdin, reader, id, method, params);
    created["id"].as_str().expect("created id").to_string()
}

#[test]
fn dashboard_counts_follow_the_evaluator() {
    let workspace = temp_dir("examd-stats");
    let (mut child, mut input, mut output) = spawn_sidecar();
    let (stdin, reader) = (&mut input, &mut output);

    request_ok(
        stdin,
        reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let empty = request_ok(stdin, reader, "2", "stats.dashboard", json!({}));
    assert_eq!(empty["totalStudents"], 0);
    assert_eq!(empty["averageScore"], 0.0);

    let cert = create(
        stdin,
        reader,
        "3",
        "certificateTypes.create",
        json!({ "name": "الثانوية العامة", "year": "2025" }),
    );
    let science = create(
        stdin,
        reader,
        "4",
        "sections.create",
        json!({ "name": "علمي", "certificateTypeId": cert }),
    );
    // No subjects: its students are counted but never scored.
    let arts = create(
        stdin,
        reader,
        "5",
        "sections.create",
        json!({ "name": "أدبي", "certificateTypeId": cert }),
    );
    let math = create(
        stdin,
        reader,
        "6",
        "subjects.create",
        json!({ "name": "الرياضيات", "sectionId": science, "maxGrade": 300, "minGrade": 150 }),
    );
    let physics = create(
        stdin,
        reader,
        "7",
        "subjects.create",
        json!({ "name": "الفيزياء", "sectionId": science, "maxGrade": 200, "minGrade": 100 }),
    );

    // (number, section, manualFail, math, physics)
    let roster = [
        ("100001", &science, false, 160, 90),
        ("100002", &science, false, 300, 200),
        ("100003", &science, true, 300, 200),
    ];
    for (i, (number, section, manual_fail, m, p)) in roster.iter().enumerate() {
        let student = create(
            stdin,
            reader,
            &format!("st-{i}"),
            "students.create",
            json!({
                "subscriptionNumber": number,
                "fullName": format!("طالب {i}"),
                "sectionId": section,
                "manualFail": manual_fail
            }),
        );
        let saved = request_ok(
            stdin,
            reader,
            &format!("gr-{i}"),
            "results.saveForStudent",
            json!({
                "studentId": student,
                "grades": [
                    { "subjectId": math, "grade": m },
                    { "subjectId": physics, "grade": p }
                ]
            }),
        );
        assert_eq!(saved["created"], 2);
    }
    create(
        stdin,
        reader,
        "8",
        "students.create",
        json!({ "subscriptionNumber": "200001", "fullName": "ريم", "sectionId": arts }),
    );

    let stats = request_ok(stdin, reader, "9", "stats.dashboard", json!({}));
    assert_eq!(stats["totalStudents"], 4);
    assert_eq!(stats["totalResults"], 6);
    assert_eq!(stats["evaluatedStudents"], 3);
    // 50 % overall but physics below its minimum, then a clean pass, then a manual fail.
    assert_eq!(stats["passedStudents"], 1);
    assert_eq!(stats["failedStudents"], 2);
    let average = stats["averageScore"].as_f64().expect("average");
    assert!((average - 250.0 / 3.0).abs() < 1e-9, "average {average}");
    assert_eq!(stats["totalSections"], 2);
    assert_eq!(stats["totalSubjects"], 2);
    assert_eq!(stats["isResultsOpen"], false);

    drop(input);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
