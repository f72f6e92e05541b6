use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("routine-{nanos}-{file_name}"))
}

fn write_store(path: &PathBuf, tasks: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 2,
        "tasks": tasks,
        "reminders": []
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn local_today() -> time::Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

fn date_string(date: time::Date) -> String {
    date.format(DATE_FORMAT).unwrap()
}

fn task(id: &str, title: &str, due_date: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "status": "pending",
        "created_at": "2026-01-01T00:00:00Z",
        "due_date": due_date
    })
}

fn ids_from_json(stdout: &str) -> Vec<String> {
    let parsed: serde_json::Value = serde_json::from_str(stdout).unwrap();
    parsed
        .as_array()
        .expect("array output")
        .iter()
        .map(|entry| entry["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn list_commands_split_by_due_date() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-list.json");
    let today = local_today();
    write_store(
        &store_path,
        serde_json::json!([
            task("task-yesterday", "overdue one", &date_string(today - Duration::days(1))),
            task("task-today", "today one", &date_string(today)),
            task("task-tomorrow", "upcoming one", &date_string(today + Duration::days(1))),
        ]),
    );

    let today_output = Command::new(exe)
        .args(["list", "today", "--json"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run list today");
    assert!(today_output.status.success());
    assert_eq!(
        ids_from_json(&String::from_utf8_lossy(&today_output.stdout)),
        vec!["task-today".to_string()]
    );

    let upcoming_output = Command::new(exe)
        .args(["list", "upcoming", "--json"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run list upcoming");
    assert!(upcoming_output.status.success());
    assert_eq!(
        ids_from_json(&String::from_utf8_lossy(&upcoming_output.stdout)),
        vec!["task-tomorrow".to_string()]
    );

    let overdue_output = Command::new(exe)
        .args(["list", "overdue", "--json"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run list overdue");
    std::fs::remove_file(&store_path).ok();
    assert!(overdue_output.status.success());
    let overdue_ids = ids_from_json(&String::from_utf8_lossy(&overdue_output.stdout));
    assert_eq!(overdue_ids, vec!["task-yesterday".to_string()]);
}

#[test]
fn list_ignores_completed_and_skipped_tasks() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-list-settled.json");
    let today = local_today();
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": "task-done",
                "title": "done one",
                "status": "completed",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": date_string(today),
                "completed_at": "2026-01-01T08:00:00Z",
                "points": 10
            },
            {
                "id": "task-skipped",
                "title": "skipped one",
                "status": "not_done",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": date_string(today),
                "not_done_reason": "ill",
                "points": -5
            },
            task("task-open", "open one", &date_string(today)),
        ]),
    );

    let output = Command::new(exe)
        .args(["list", "today", "--json"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run list today");
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert_eq!(
        ids_from_json(&String::from_utf8_lossy(&output.stdout)),
        vec!["task-open".to_string()]
    );
}

#[test]
fn list_plain_marks_overdue_tasks() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-list-plain.json");
    let today = local_today();
    write_store(
        &store_path,
        serde_json::json!([
            task("task-late", "late one", &date_string(today - Duration::days(3))),
        ]),
    );

    let output = Command::new(exe)
        .args(["list", "overdue"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run list overdue");
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("task-late"));
    assert!(stdout.contains("(overdue)"));
    assert!(stdout.contains("overdue"));
}
