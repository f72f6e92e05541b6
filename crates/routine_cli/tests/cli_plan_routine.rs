use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

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

#[test]
fn plan_command_creates_linked_next_instance() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-plan.json");
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": "task-1",
                "title": "water the plants",
                "status": "completed",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": "2026-01-10",
                "due_time": "07:30",
                "completed_at": "2026-01-10T08:00:00Z",
                "points": 10
            }
        ]),
    );

    let output = Command::new(exe)
        .args(["plan", "task-1", "7"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run plan command");

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let tasks = stored["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 2);

    let group = tasks[0]["routine_group_id"].as_str().expect("group id");
    assert_eq!(tasks[1]["routine_group_id"].as_str(), Some(group));
    assert_eq!(tasks[1]["status"], "pending");
    assert_eq!(tasks[1]["due_date"], "2026-01-17");
    assert_eq!(tasks[1]["due_time"], "07:30");
    assert_eq!(tasks[1]["title"], "water the plants");
    assert!(tasks[1]["progress_start_at"].is_string());
}

#[test]
fn routine_stats_command_reports_aggregates() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-stats.json");
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": "task-1",
                "title": "water the plants",
                "status": "completed",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": "2026-01-05",
                "completed_at": "2026-01-05T08:00:00Z",
                "points": 10,
                "routine_group_id": "routine-1"
            },
            {
                "id": "task-2",
                "title": "water the plants",
                "status": "completed",
                "created_at": "2026-01-05T08:00:00Z",
                "due_date": "2026-01-12",
                "completed_at": "2026-01-15T08:00:00Z",
                "points": 10,
                "routine_group_id": "routine-1"
            },
            {
                "id": "task-3",
                "title": "water the plants",
                "status": "pending",
                "created_at": "2026-01-15T08:00:00Z",
                "due_date": "2026-01-22",
                "routine_group_id": "routine-1"
            }
        ]),
    );

    let output = Command::new(exe)
        .args(["routine", "stats", "routine-1", "--json"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run routine stats command");

    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success());

    let stats: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["completed"], 2);
    assert_eq!(stats["upcoming"], 1);
    assert_eq!(stats["skipped"], 0);
    assert_eq!(stats["points_balance"], 20);
    assert_eq!(stats["current_streak"], 2);
    assert_eq!(stats["average_interval_days"], 10.0);
    assert_eq!(stats["last_completed_at"], "2026-01-15T08:00:00Z");
    assert_eq!(stats["next_due_date"], "2026-01-22");
}

#[test]
fn routine_delete_command_removes_all_instances() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-routine-delete.json");
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": "task-1",
                "title": "water the plants",
                "status": "completed",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": "2026-01-05",
                "completed_at": "2026-01-05T08:00:00Z",
                "points": 10,
                "routine_group_id": "routine-1"
            },
            {
                "id": "task-2",
                "title": "water the plants",
                "status": "pending",
                "created_at": "2026-01-05T08:00:00Z",
                "due_date": "2026-01-12",
                "routine_group_id": "routine-1"
            },
            {
                "id": "task-3",
                "title": "stretch",
                "status": "pending",
                "created_at": "2026-01-01T00:00:00Z",
                "due_date": "2026-01-12"
            }
        ]),
    );

    let output = Command::new(exe)
        .args(["routine", "delete", "routine-1"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run routine delete command");

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 instance(s)"));

    let tasks = stored["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], "task-3");
}

#[test]
fn routine_stats_command_rejects_unknown_group() {
    let exe = env!("CARGO_BIN_EXE_routine");
    let store_path = temp_path("cli-stats-missing.json");
    write_store(&store_path, serde_json::json!([]));

    let output = Command::new(exe)
        .args(["routine", "stats", "routine-404"])
        .env("ROUTINE_STORE_PATH", &store_path)
        .output()
        .expect("failed to run routine stats command");

    std::fs::remove_file(&store_path).ok();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not_found"));
}
