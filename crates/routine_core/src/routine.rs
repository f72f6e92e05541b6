//! Derived read-only aggregates over one routine's instance history.
//!
//! A routine group is only ever a filter over the stored instances; stats
//! are recomputed on demand and never persisted.

use crate::error::AppError;
use crate::model::{TaskInstance, TaskStatus};
use crate::schedule;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct RoutineStats {
    pub group_id: String,
    pub total: usize,
    pub completed: usize,
    pub upcoming: usize,
    pub skipped: usize,
    pub points_balance: i64,
    pub average_interval_days: f64,
    pub current_streak: usize,
    pub last_completed_at: Option<String>,
    pub next_due_date: Option<String>,
}

/// Due date of the next planned instance after `prior`. Intervals that
/// push past the calendar's supported range are rejected.
pub fn next_due_date(prior: Date, interval_days: u32) -> Result<Date, AppError> {
    prior
        .checked_add(Duration::days(i64::from(interval_days)))
        .ok_or_else(|| AppError::invalid_input("interval pushes the due date out of range"))
}

/// Instances of one group, sorted by due date ascending. The `id` acts as
/// a tiebreaker so repeated calls stay stable.
pub fn group_instances(tasks: &[TaskInstance], group_id: &str) -> Vec<TaskInstance> {
    let mut instances: Vec<TaskInstance> = tasks
        .iter()
        .filter(|task| task.routine_group_id.as_deref() == Some(group_id))
        .cloned()
        .collect();
    instances.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
    instances
}

/// Aggregate a group's history. `instances` must already be the group
/// view (see [`group_instances`]); order does not matter here.
pub fn routine_stats(group_id: &str, instances: &[TaskInstance]) -> Result<RoutineStats, AppError> {
    let total = instances.len();
    let completed = count_status(instances, TaskStatus::Completed);
    let upcoming = count_status(instances, TaskStatus::Pending);
    let skipped = count_status(instances, TaskStatus::NotDone);
    let points_balance = instances.iter().map(|task| task.points).sum();

    let mut completions = Vec::with_capacity(completed);
    for task in instances {
        if let Some(completed_at) = task.completed_at.as_deref() {
            let parsed = OffsetDateTime::parse(completed_at, &Rfc3339)
                .map_err(|_| AppError::invalid_data("completed_at must be RFC3339"))?;
            completions.push(parsed);
        }
    }
    completions.sort();
    let average_interval_days = schedule::average_interval_days(&completions);

    let last_completed_at = completions
        .last()
        .map(|moment| moment.format(&Rfc3339))
        .transpose()
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    let next_due_date = instances
        .iter()
        .filter(|task| task.status == TaskStatus::Pending)
        .map(|task| task.due_date.clone())
        .min();

    // Streak looks only at instances that already happened, most recent
    // first; a pending future instance must not break it.
    let mut settled: Vec<TaskInstance> = instances
        .iter()
        .filter(|task| task.status != TaskStatus::Pending)
        .cloned()
        .collect();
    settled.sort_by(|a, b| b.due_date.cmp(&a.due_date).then(b.id.cmp(&a.id)));
    let current_streak = schedule::current_streak(&settled);

    Ok(RoutineStats {
        group_id: group_id.to_string(),
        total,
        completed,
        upcoming,
        skipped,
        points_balance,
        average_interval_days,
        current_streak,
        last_completed_at,
        next_due_date,
    })
}

fn count_status(instances: &[TaskInstance], status: TaskStatus) -> usize {
    instances.iter().filter(|task| task.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::{group_instances, next_due_date, routine_stats};
    use crate::model::{TaskInstance, TaskStatus};
    use time::macros::date;

    fn instance(id: &str, due_date: &str, status: TaskStatus) -> TaskInstance {
        TaskInstance {
            id: id.to_string(),
            title: "stretch".to_string(),
            status,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            due_date: due_date.to_string(),
            due_time: None,
            completed_at: None,
            not_done_reason: None,
            points: 0,
            progress_start_at: None,
            routine_group_id: Some("routine-1".to_string()),
            postpone_count: 0,
        }
    }

    fn completed(id: &str, due_date: &str, completed_at: &str) -> TaskInstance {
        let mut task = instance(id, due_date, TaskStatus::Completed);
        task.completed_at = Some(completed_at.to_string());
        task.points = 10;
        task
    }

    #[test]
    fn next_due_date_adds_interval() {
        assert_eq!(next_due_date(date!(2026-01-10), 7).unwrap(), date!(2026-01-17));
        assert_eq!(next_due_date(date!(2026-01-31), 1).unwrap(), date!(2026-02-01));
    }

    #[test]
    fn next_due_date_rejects_out_of_range_interval() {
        let err = next_due_date(date!(2026-01-10), u32::MAX).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn group_instances_filters_and_sorts() {
        let mut other = instance("task-9", "2026-01-02", TaskStatus::Pending);
        other.routine_group_id = Some("routine-2".to_string());
        let tasks = vec![
            instance("task-2", "2026-01-12", TaskStatus::Pending),
            other,
            instance("task-1", "2026-01-05", TaskStatus::Completed),
        ];

        let group = group_instances(&tasks, "routine-1");
        let ids: Vec<&str> = group.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["task-1", "task-2"]);
    }

    #[test]
    fn routine_stats_counts_and_points() {
        let mut skipped = instance("task-3", "2026-01-15", TaskStatus::NotDone);
        skipped.not_done_reason = Some("travelling".to_string());
        skipped.points = -5;
        let instances = vec![
            completed("task-1", "2026-01-05", "2026-01-05T08:00:00Z"),
            completed("task-2", "2026-01-10", "2026-01-15T08:00:00Z"),
            skipped,
            instance("task-4", "2026-01-20", TaskStatus::Pending),
        ];

        let stats = routine_stats("routine-1", &instances).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.upcoming, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.points_balance, 15);
        assert_eq!(stats.average_interval_days, 10.0);
        assert_eq!(stats.last_completed_at.as_deref(), Some("2026-01-15T08:00:00Z"));
        assert_eq!(stats.next_due_date.as_deref(), Some("2026-01-20"));
    }

    #[test]
    fn routine_stats_streak_ignores_pending_instances() {
        let instances = vec![
            completed("task-1", "2026-01-01", "2026-01-01T08:00:00Z"),
            completed("task-2", "2026-01-08", "2026-01-08T08:00:00Z"),
            instance("task-3", "2026-01-15", TaskStatus::Pending),
        ];

        let stats = routine_stats("routine-1", &instances).unwrap();
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn routine_stats_streak_stops_at_skip() {
        let mut skipped = instance("task-2", "2026-01-08", TaskStatus::NotDone);
        skipped.not_done_reason = Some("ill".to_string());
        let instances = vec![
            completed("task-1", "2026-01-01", "2026-01-01T08:00:00Z"),
            skipped,
            completed("task-3", "2026-01-15", "2026-01-15T08:00:00Z"),
        ];

        let stats = routine_stats("routine-1", &instances).unwrap();
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn routine_stats_empty_group() {
        let stats = routine_stats("routine-1", &[]).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_interval_days, 0.0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.last_completed_at, None);
        assert_eq!(stats.next_due_date, None);
    }
}
