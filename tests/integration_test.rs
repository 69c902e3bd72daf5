use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tabnotes::{KeyValueStore, SqliteStore};
use tempfile::TempDir;

fn tabnotes_cmd(origin: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tabnotes"));
    cmd.arg("--origin").arg(origin);
    cmd
}

/// Run a page with `input` piped to stdin; end of input closes the page.
fn run_page(origin: &Path, page: &str, input: &str) -> Output {
    let mut child = tabnotes_cmd(origin)
        .arg(page)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

/// Start a page whose stdin stays open until the caller closes it.
fn spawn_page(origin: &Path, page: &str, args: &[&str]) -> Child {
    tabnotes_cmd(origin)
        .arg(page)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

/// Poll `list --json` until `check` accepts the notes or `timeout` passes.
fn wait_for_notes(
    origin: &Path,
    timeout: Duration,
    check: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    let deadline = Instant::now() + timeout;
    loop {
        let notes = list_json(origin);
        if check(&notes) || Instant::now() >= deadline {
            return notes;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn list_json(origin: &Path) -> serde_json::Value {
    let output = tabnotes_cmd(origin).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_list_on_fresh_origin() {
    let tmp = TempDir::new().unwrap();
    let origin = tmp.path().join("origin");

    let output = tabnotes_cmd(&origin).arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(no notes)"));
    assert!(origin.join("storage.db").exists());
}

#[test]
fn test_draft_survives_reload_in_reader() {
    let tmp = TempDir::new().unwrap();

    let output = run_page(tmp.path(), "write", "add\nedit 0 draft\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added note 0"));

    let output = tabnotes_cmd(tmp.path()).arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[0] (read) draft"));
    assert!(stdout.contains("Last updated: "));
}

#[test]
fn test_list_json_is_sorted_by_id() {
    let tmp = TempDir::new().unwrap();

    let output = run_page(
        tmp.path(),
        "write",
        "add first\nadd second\nadd third\nsave\n",
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Saved 3 note(s)"));

    let notes = list_json(tmp.path());
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0]["id"], 0);
    assert_eq!(notes[0]["text"], "first");
    assert_eq!(notes[2]["id"], 2);
    assert_eq!(notes[2]["text"], "third");
}

#[test]
fn test_ids_continue_after_reload() {
    let tmp = TempDir::new().unwrap();

    run_page(tmp.path(), "write", "add one\nadd two\n");
    let output = run_page(tmp.path(), "write", "rm 1\nadd three\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Removed note 1"));
    assert!(stdout.contains("Added note 2"));

    let notes = list_json(tmp.path());
    let ids: Vec<u64> = notes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 2]);
}

#[test]
fn test_reader_page_is_read_only() {
    let tmp = TempDir::new().unwrap();

    let output = run_page(tmp.path(), "read", "add nope\nshow\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("read-only"));

    let notes = list_json(tmp.path());
    assert!(notes.as_array().unwrap().is_empty());
}

#[test]
fn test_bad_commands_do_not_end_the_page() {
    let tmp = TempDir::new().unwrap();

    let output = run_page(tmp.path(), "write", "bogus\nedit 9 x\nadd kept\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown command"));
    assert!(stderr.contains("Note not found: 9"));

    let notes = list_json(tmp.path());
    assert_eq!(notes[0]["text"], "kept");
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.json"), r#"{"key_prefix": ""}"#).unwrap();

    let output = tabnotes_cmd(tmp.path()).arg("list").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid config"));
}

#[test]
fn test_custom_prefix_from_config() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.json"), r#"{"key_prefix": "memo"}"#).unwrap();

    let output = run_page(tmp.path(), "write", "add hello\n");
    assert!(output.status.success());

    let store = SqliteStore::open(tmp.path()).unwrap();
    assert_eq!(store.get_item("memo 0").unwrap(), Some("hello".to_string()));
    assert_eq!(store.get_item("note 0").unwrap(), None);
    assert!(store.get_item("last_saved_timestamp").unwrap().is_some());
}

#[test]
fn test_open_writer_saves_after_quiet_period() {
    let tmp = TempDir::new().unwrap();
    let mut writer = spawn_page(tmp.path(), "write", &["--save-interval-ms", "200"]);
    let mut stdin = writer.stdin.take().unwrap();
    stdin.write_all(b"add\nedit 0 draft\n").unwrap();
    stdin.flush().unwrap();

    let notes = wait_for_notes(tmp.path(), Duration::from_secs(5), |notes| {
        notes[0]["text"] == "draft"
    });
    assert_eq!(notes[0]["id"], 0);
    assert_eq!(notes[0]["text"], "draft");
    assert!(writer.try_wait().unwrap().is_none());

    drop(stdin);
    let output = writer.wait_with_output().unwrap();
    assert!(output.status.success());
    // Nothing was left for the exit flush
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Saved pending notes"));
}

#[test]
fn test_reader_page_follows_writer_in_another_process() {
    let tmp = TempDir::new().unwrap();
    let reader = spawn_page(tmp.path(), "read", &["--poll-interval-ms", "50"]);
    thread::sleep(Duration::from_millis(500));

    let output = run_page(tmp.path(), "write", "add hello\nsave\n");
    assert!(output.status.success());
    thread::sleep(Duration::from_millis(1000));

    let mut reader = reader;
    drop(reader.stdin.take());
    let output = reader.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let empty = stdout.find("(no notes)").unwrap();
    let synced = stdout.find("[0] (read) hello").unwrap();
    assert!(empty < synced);
}

#[cfg(unix)]
#[test]
fn test_interrupt_saves_pending_notes() {
    let tmp = TempDir::new().unwrap();
    let mut writer = spawn_page(tmp.path(), "write", &["--save-interval-ms", "60000"]);
    let mut stdin = writer.stdin.take().unwrap();
    stdin.write_all(b"add\nedit 0 kept\n").unwrap();
    stdin.flush().unwrap();

    let mut stdout = BufReader::new(writer.stdout.take().unwrap());
    let mut line = String::new();
    while !line.contains("Added note 0") {
        line.clear();
        assert!(stdout.read_line(&mut line).unwrap() > 0);
    }
    thread::sleep(Duration::from_millis(300));

    let status = Command::new("kill")
        .args(["-INT", &writer.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();
    assert!(writer.wait().unwrap().success());
    assert!(rest.contains("Saved pending notes"));

    let notes = list_json(tmp.path());
    assert_eq!(notes[0]["text"], "kept");
}
