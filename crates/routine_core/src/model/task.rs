use serde::{Deserialize, Serialize};

/// One occurrence of a (possibly recurring) task. Instances of the same
/// routine share a `routine_group_id`; the group itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub due_date: String,
    /// Optional time of day, `HH:MM`. Missing means end of day (23:59).
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub not_done_reason: Option<String>,
    #[serde(default)]
    pub points: i64,
    /// Where the progress bar starts counting from. Missing means "now".
    #[serde(default)]
    pub progress_start_at: Option<String>,
    #[serde(default)]
    pub routine_group_id: Option<String>,
    #[serde(default)]
    pub postpone_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    NotDone,
}
