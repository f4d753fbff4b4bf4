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

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_assessd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn assessd");
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

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("assessd-router-smoke");

    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // First account bootstraps without a session.
    let created = request(
        &mut stdin,
        &mut reader,
        "3",
        "evaluators.create",
        json!({ "username": "root", "password": "rootpw", "role": "Administrator" }),
    );
    assert_eq!(created["ok"], json!(true));

    let login = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "role": "Administrator", "username": "root", "password": "rootpw" }),
    );
    assert_eq!(login["ok"], json!(true));

    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "evaluators.create",
        json!({
            "username": "tech1",
            "password": "pw1",
            "role": "Evaluator",
            "fullName": "Tech One",
            "email": "tech1@example.com"
        }),
    );
    let listed = request(&mut stdin, &mut reader, "6", "evaluators.list", json!({}));
    assert_eq!(listed["result"]["count"], json!(2));

    let _ = request(
        &mut stdin,
        &mut reader,
        "7",
        "evaluators.update",
        json!({ "username": "tech1", "fullName": "Tech One Sr" }),
    );

    let login = request(
        &mut stdin,
        &mut reader,
        "8",
        "auth.login",
        json!({ "role": "Evaluator", "username": "tech1", "password": "pw1" }),
    );
    assert_eq!(login["ok"], json!(true));

    let trainer = request(
        &mut stdin,
        &mut reader,
        "9",
        "trainers.create",
        json!({ "name": "Asha Rao", "department": "Coding", "email": "asha@example.com" }),
    );
    assert_eq!(trainer["result"]["generated"], json!(true));
    let trainer_id = trainer["result"]["trainer"]["trainerId"]
        .as_str()
        .expect("trainerId")
        .to_string();

    let _ = request(&mut stdin, &mut reader, "10", "trainers.list", json!({}));
    let got = request(
        &mut stdin,
        &mut reader,
        "11",
        "trainers.get",
        json!({ "trainerId": trainer_id }),
    );
    assert_eq!(got["ok"], json!(true));

    let gates = request(
        &mut stdin,
        &mut reader,
        "12",
        "assessment.gates",
        json!({ "trainerId": trainer_id }),
    );
    assert_eq!(gates["result"]["levels"][0]["unlocked"], json!(true));
    assert_eq!(gates["result"]["levels"][0]["state"], json!("unlockedPending"));

    let history = request(
        &mut stdin,
        &mut reader,
        "13",
        "assessment.history",
        json!({ "trainerId": trainer_id }),
    );
    assert_eq!(history["result"]["count"], json!(0));

    let reminder = request(
        &mut stdin,
        &mut reader,
        "14",
        "email.reminder",
        json!({
            "trainerId": trainer_id,
            "level": 1,
            "recipient": "tech1@example.com",
            "reminder": "first assessment pending"
        }),
    );
    assert_eq!(reminder["ok"], json!(true));

    let csv = request(
        &mut stdin,
        &mut reader,
        "15",
        "reports.trainerCsv",
        json!({ "trainerId": trainer_id }),
    );
    assert_eq!(csv["ok"], json!(true));

    let session = request(&mut stdin, &mut reader, "16", "auth.session", json!({}));
    assert_eq!(session["result"]["session"]["username"], json!("tech1"));

    let _ = request(&mut stdin, &mut reader, "17", "auth.logout", json!({}));
    let session = request(&mut stdin, &mut reader, "18", "auth.session", json!({}));
    assert_eq!(session["result"]["session"], json!(null));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
