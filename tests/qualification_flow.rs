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
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn full_scores(role: &str) -> serde_json::Value {
    match role {
        "technical" => json!({
            "stemKnowledge": 5,
            "stemIntegration": 10,
            "stemCurrency": 5,
            "courseOutline": 5,
            "languageFluency": 5,
            "lessonPreparation": 5
        }),
        _ => json!({
            "timeBasedActivity": 5,
            "studentEngagement": 5,
            "pleasingLook": 5,
            "poisedConfident": 5,
            "voiceModulation": 5
        }),
    }
}

fn qualified_draft(trainer_id: &str, role: &str, level: u8) -> serde_json::Value {
    let courses: Vec<serde_json::Value> = (1..=10)
        .map(|i| {
            json!({
                "name": format!("Course {}", i),
                "passed": true,
                "scores": full_scores(role),
                "status": "cleared",
                "remarks": ""
            })
        })
        .collect();
    json!({
        "trainerId": trainer_id,
        "role": role,
        "level": level,
        "courses": courses,
        "proposed": "qualified",
        "managerReferral": if level == 3 { "Approved by R. Mehta" } else { "" },
        "reminder": ""
    })
}

struct Harness {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u32,
}

impl Harness {
    fn start(workspace: &PathBuf) -> Harness {
        let (child, stdin, reader) = spawn_daemon();
        let mut harness = Harness {
            child,
            stdin,
            reader,
            next_id: 0,
        };
        let resp = harness.call(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(resp["ok"], json!(true));
        harness
    }

    fn call(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        request(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn login(&mut self, role: &str, username: &str, password: &str) {
        let resp = self.call(
            "auth.login",
            json!({ "role": role, "username": username, "password": password }),
        );
        assert_eq!(resp["ok"], json!(true), "login {} failed: {}", username, resp);
    }

    fn finish(mut self, workspace: PathBuf) {
        drop(self.stdin);
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(workspace);
    }
}

fn seed_accounts(harness: &mut Harness) {
    let resp = harness.call(
        "evaluators.create",
        json!({ "username": "root", "password": "rootpw", "role": "Administrator" }),
    );
    assert_eq!(resp["ok"], json!(true));
    harness.login("Administrator", "root", "rootpw");
    for username in ["tech1", "ops1"] {
        let resp = harness.call(
            "evaluators.create",
            json!({ "username": username, "password": "pw", "role": "Evaluator" }),
        );
        assert_eq!(resp["ok"], json!(true));
    }
}

#[test]
fn level_qualification_needs_both_roles_and_gates_hold() {
    let workspace = temp_dir("assessd-qualification-flow");
    let mut h = Harness::start(&workspace);
    seed_accounts(&mut h);

    h.login("Evaluator", "tech1", "pw");
    let trainer = h.call(
        "trainers.create",
        json!({ "name": "Asha Rao", "department": "Coding", "email": "asha@example.com" }),
    );
    let trainer_id = trainer["result"]["trainer"]["trainerId"]
        .as_str()
        .expect("trainerId")
        .to_string();
    assert_eq!(trainer_id, "TR001");

    // First evaluator: passes through unadjudicated, level goes partial.
    let submit = h.call(
        "assessment.submit",
        json!({ "draft": qualified_draft(&trainer_id, "technical", 1) }),
    );
    assert_eq!(submit["ok"], json!(true), "{}", submit);
    assert_eq!(submit["result"]["finalStatus"], json!("QUALIFIED"));
    assert_eq!(submit["result"]["warnings"], json!([]));
    assert_eq!(submit["result"]["levelTotal"], json!(350));

    let gates = h.call("assessment.gates", json!({ "trainerId": trainer_id }));
    let levels = &gates["result"]["levels"];
    assert_eq!(levels[0]["state"], json!("qualifiedPartial"));
    assert_eq!(levels[0]["distinctEvaluators"], json!(1));
    assert_eq!(levels[0]["hasTechnical"], json!(true));
    assert_eq!(levels[0]["hasOperations"], json!(false));
    // Unlocking is per-course: every level-1 course is CLEARED already.
    assert_eq!(levels[1]["unlocked"], json!(true));
    assert_eq!(levels[1]["state"], json!("unlockedPending"));
    assert_eq!(levels[2]["state"], json!("locked"));

    // Second evaluator, other role: level becomes fully qualified.
    h.login("Evaluator", "ops1", "pw");
    let submit = h.call(
        "assessment.submit",
        json!({ "draft": qualified_draft(&trainer_id, "schoolOperations", 1) }),
    );
    assert_eq!(submit["ok"], json!(true), "{}", submit);
    assert_eq!(submit["result"]["finalStatus"], json!("QUALIFIED"));
    assert_eq!(submit["result"]["levelTotal"], json!(250));

    let gates = h.call("assessment.gates", json!({ "trainerId": trainer_id }));
    let levels = &gates["result"]["levels"];
    assert_eq!(levels[0]["state"], json!("qualifiedFull"));
    assert_eq!(levels[0]["distinctEvaluators"], json!(2));
    assert_eq!(levels[0]["qualified"], json!(true));

    // Both evaluators' rows coexist in the store.
    let history = h.call("assessment.history", json!({ "trainerId": trainer_id }));
    assert_eq!(history["result"]["count"], json!(2));

    // A fully qualified level rejects further submissions.
    let again = h.call(
        "assessment.submit",
        json!({ "draft": qualified_draft(&trainer_id, "technical", 1) }),
    );
    assert_eq!(again["ok"], json!(false));
    assert_eq!(again["error"]["code"], json!("already_qualified"));

    // Level 3 stays locked until level 2's courses clear.
    let locked = h.call(
        "assessment.submit",
        json!({ "draft": qualified_draft(&trainer_id, "technical", 3) }),
    );
    assert_eq!(locked["ok"], json!(false));
    assert_eq!(locked["error"]["code"], json!("level_locked"));

    // A REDO course at level 2 keeps level 3 shut.
    h.login("Evaluator", "tech1", "pw");
    let mut level2 = qualified_draft(&trainer_id, "technical", 2);
    level2["courses"][4]["status"] = json!("redo");
    level2["proposed"] = json!("notQualified");
    let submit = h.call("assessment.submit", json!({ "draft": level2 }));
    assert_eq!(submit["ok"], json!(true), "{}", submit);

    let gates = h.call("assessment.gates", json!({ "trainerId": trainer_id }));
    assert_eq!(gates["result"]["levels"][2]["unlocked"], json!(false));

    // Clearing the course re-opens level 3 and the attempt counter shows the redo.
    let submit = h.call(
        "assessment.submit",
        json!({ "draft": qualified_draft(&trainer_id, "technical", 2) }),
    );
    assert_eq!(submit["ok"], json!(true), "{}", submit);
    let gates = h.call("assessment.gates", json!({ "trainerId": trainer_id }));
    assert_eq!(gates["result"]["levels"][2]["unlocked"], json!(true));

    let history = h.call("assessment.history", json!({ "trainerId": trainer_id }));
    let rows = history["result"]["rows"].as_array().expect("rows");
    let tech_row = rows
        .iter()
        .find(|row| {
            row["evaluatorUsername"] == json!("tech1")
                && row["levels"][1]["outcome"] == json!("qualified")
        })
        .expect("tech1 level-2 row");
    assert_eq!(tech_row["levels"][1]["courses"][4]["attempts"], json!(1));

    h.finish(workspace);
}
