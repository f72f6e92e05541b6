use crate::error::AppError;
use crate::model::{TaskInstance, TaskStatus};
use crate::routine::{self, RoutineStats};
use crate::schedule;
use crate::storage::json_store;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

pub const COMPLETION_POINTS: i64 = 10;
pub const SKIP_POINTS: i64 = 5;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

pub fn add_task(title: &str, due_date: &str, due_time: Option<&str>) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, title, due_date, due_time)
}

fn add_task_with_path(
    path: &Path,
    title: &str,
    due_date: &str,
    due_time: Option<&str>,
) -> Result<TaskInstance, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let due_date = parse_due_date(due_date)?;
    let due_time = match due_time {
        Some(value) => Some(parse_due_time(value)?),
        None => None,
    };

    let now = OffsetDateTime::now_utc();
    let created_at = format_rfc3339(now)?;
    let task = TaskInstance {
        id: fresh_id("task"),
        title: trimmed.to_string(),
        status: TaskStatus::Pending,
        created_at,
        due_date: format_date(due_date)?,
        due_time: due_time.map(format_time_of_day).transpose()?,
        completed_at: None,
        not_done_reason: None,
        points: 0,
        progress_start_at: None,
        routine_group_id: None,
        postpone_count: 0,
    };

    let mut state = json_store::load_state(path)?;
    state.tasks.push(task.clone());
    json_store::save_state(path, &state)?;

    Ok(task)
}

pub fn edit_task(id: &str, new_title: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    edit_task_with_path(&path, id, new_title)
}

fn edit_task_with_path(path: &Path, id: &str, new_title: &str) -> Result<TaskInstance, AppError> {
    let trimmed_title = new_title.trim();
    if trimmed_title.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    mutate_task(path, id, |task| {
        task.title = trimmed_title.to_string();
        Ok(())
    })
}

pub fn delete_task(id: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id)
}

fn delete_task_with_path(path: &Path, id: &str) -> Result<TaskInstance, AppError> {
    let trimmed_id = required_id(id)?;

    let mut state = json_store::load_state(path)?;
    let index = state
        .tasks
        .iter()
        .position(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("task not found"))?;

    let removed = state.tasks.remove(index);
    json_store::save_state(path, &state)?;

    Ok(removed)
}

pub fn get_task_by_id(id: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    get_task_by_id_with_path(&path, id)
}

fn get_task_by_id_with_path(path: &Path, id: &str) -> Result<TaskInstance, AppError> {
    let trimmed_id = required_id(id)?;

    let state = json_store::load_state(path)?;
    state
        .tasks
        .into_iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("task not found"))
}

/// Mark an instance completed: completion timestamp set, any skip reason
/// cleared, points awarded.
pub fn complete_task(id: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    complete_task_with_path(&path, id, OffsetDateTime::now_utc())
}

fn complete_task_with_path(
    path: &Path,
    id: &str,
    now: OffsetDateTime,
) -> Result<TaskInstance, AppError> {
    let completed_at = format_rfc3339(now)?;
    mutate_task(path, id, |task| {
        if task.status == TaskStatus::Completed {
            return Err(AppError::invalid_input("task is already completed"));
        }
        task.status = TaskStatus::Completed;
        task.completed_at = Some(completed_at.clone());
        task.not_done_reason = None;
        task.points = COMPLETION_POINTS;
        Ok(())
    })
}

/// Mark an instance skipped with a reason; completion fields are cleared
/// and points deducted.
pub fn skip_task(id: &str, reason: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    skip_task_with_path(&path, id, reason)
}

fn skip_task_with_path(path: &Path, id: &str, reason: &str) -> Result<TaskInstance, AppError> {
    let trimmed_reason = reason.trim();
    if trimmed_reason.is_empty() {
        return Err(AppError::invalid_input("reason is required"));
    }

    mutate_task(path, id, |task| {
        if task.status == TaskStatus::NotDone {
            return Err(AppError::invalid_input("task is already skipped"));
        }
        task.status = TaskStatus::NotDone;
        task.not_done_reason = Some(trimmed_reason.to_string());
        task.completed_at = None;
        task.points = -SKIP_POINTS;
        Ok(())
    })
}

/// Revert a completion or skip back to pending, including the points
/// delta.
pub fn undo_task(id: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    undo_task_with_path(&path, id)
}

fn undo_task_with_path(path: &Path, id: &str) -> Result<TaskInstance, AppError> {
    mutate_task(path, id, |task| {
        if task.status == TaskStatus::Pending {
            return Err(AppError::invalid_input("task is neither completed nor skipped"));
        }
        task.status = TaskStatus::Pending;
        task.completed_at = None;
        task.not_done_reason = None;
        task.points = 0;
        Ok(())
    })
}

pub fn postpone_task(id: &str, new_due_date: &str) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    postpone_task_with_path(&path, id, new_due_date)
}

fn postpone_task_with_path(
    path: &Path,
    id: &str,
    new_due_date: &str,
) -> Result<TaskInstance, AppError> {
    let new_date = parse_due_date(new_due_date)?;
    let formatted = format_date(new_date)?;

    mutate_task(path, id, |task| {
        if task.status != TaskStatus::Pending {
            return Err(AppError::invalid_input("only pending tasks can be postponed"));
        }
        let current = parse_due_date(&task.due_date)?;
        if new_date <= current {
            return Err(AppError::invalid_input("new due date must be after the current one"));
        }
        task.due_date = formatted.clone();
        task.postpone_count += 1;
        Ok(())
    })
}

/// Create the next instance of a routine from a prior one: same title,
/// due date pushed out by `interval_days`, progress measured from now.
/// A standalone task gets a fresh group id on its first plan, which also
/// links the prior instance into the group.
pub fn plan_forward(id: &str, interval_days: u32) -> Result<TaskInstance, AppError> {
    let path = json_store::store_path()?;
    plan_forward_with_path(&path, id, interval_days)
}

fn plan_forward_with_path(
    path: &Path,
    id: &str,
    interval_days: u32,
) -> Result<TaskInstance, AppError> {
    let trimmed_id = required_id(id)?;
    if interval_days == 0 {
        return Err(AppError::invalid_input("interval must be at least 1 day"));
    }

    let mut state = json_store::load_state(path)?;
    let prior = state
        .tasks
        .iter_mut()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("task not found"))?;

    let group_id = match prior.routine_group_id.clone() {
        Some(group_id) => group_id,
        None => {
            let minted = fresh_id("routine");
            prior.routine_group_id = Some(minted.clone());
            minted
        }
    };

    let prior_due = parse_due_date(&prior.due_date)?;
    let next_due = routine::next_due_date(prior_due, interval_days)?;
    let now = OffsetDateTime::now_utc();
    let stamp = format_rfc3339(now)?;

    let next = TaskInstance {
        id: fresh_id("task"),
        title: prior.title.clone(),
        status: TaskStatus::Pending,
        created_at: stamp.clone(),
        due_date: format_date(next_due)?,
        due_time: prior.due_time.clone(),
        completed_at: None,
        not_done_reason: None,
        points: 0,
        progress_start_at: Some(stamp),
        routine_group_id: Some(group_id),
        postpone_count: 0,
    };

    state.tasks.push(next.clone());
    json_store::save_state(path, &state)?;

    Ok(next)
}

pub fn routine_instances(group_id: &str) -> Result<Vec<TaskInstance>, AppError> {
    let path = json_store::store_path()?;
    routine_instances_with_path(&path, group_id)
}

fn routine_instances_with_path(path: &Path, group_id: &str) -> Result<Vec<TaskInstance>, AppError> {
    let trimmed_id = required_id(group_id)?;
    let state = json_store::load_state(path)?;
    Ok(routine::group_instances(&state.tasks, trimmed_id))
}

pub fn routine_stats(group_id: &str) -> Result<RoutineStats, AppError> {
    let path = json_store::store_path()?;
    routine_stats_with_path(&path, group_id)
}

fn routine_stats_with_path(path: &Path, group_id: &str) -> Result<RoutineStats, AppError> {
    let trimmed_id = required_id(group_id)?;
    let instances = routine_instances_with_path(path, trimmed_id)?;
    if instances.is_empty() {
        return Err(AppError::not_found("routine not found"));
    }
    routine::routine_stats(trimmed_id, &instances)
}

/// Delete every instance of a routine; returns how many were removed.
pub fn delete_routine(group_id: &str) -> Result<usize, AppError> {
    let path = json_store::store_path()?;
    delete_routine_with_path(&path, group_id)
}

fn delete_routine_with_path(path: &Path, group_id: &str) -> Result<usize, AppError> {
    let trimmed_id = required_id(group_id)?;

    let mut state = json_store::load_state(path)?;
    let before = state.tasks.len();
    state
        .tasks
        .retain(|task| task.routine_group_id.as_deref() != Some(trimmed_id));
    let removed = before - state.tasks.len();

    if removed == 0 {
        return Err(AppError::not_found("routine not found"));
    }

    json_store::save_state(path, &state)?;
    Ok(removed)
}

pub fn list_today() -> Result<Vec<TaskInstance>, AppError> {
    list(ListMode::Today)
}

pub fn list_upcoming() -> Result<Vec<TaskInstance>, AppError> {
    list(ListMode::Upcoming)
}

pub fn list_overdue() -> Result<Vec<TaskInstance>, AppError> {
    list(ListMode::Overdue)
}

fn list(mode: ListMode) -> Result<Vec<TaskInstance>, AppError> {
    let path = json_store::store_path()?;
    list_with_path(&path, mode)
}

fn list_with_path(path: &Path, mode: ListMode) -> Result<Vec<TaskInstance>, AppError> {
    let tasks = json_store::load_state(path)?.tasks;
    let offset = local_offset();
    let now_local = OffsetDateTime::now_utc().to_offset(offset);
    filter_tasks(&tasks, now_local, mode)
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

enum ListMode {
    Today,
    Upcoming,
    Overdue,
}

fn filter_tasks(
    tasks: &[TaskInstance],
    now_local: OffsetDateTime,
    mode: ListMode,
) -> Result<Vec<TaskInstance>, AppError> {
    let today = now_local.date();
    let mut filtered = Vec::new();

    for task in tasks {
        if task.status != TaskStatus::Pending {
            continue;
        }

        let due_date = parse_due_date(&task.due_date)?;
        let matches = match mode {
            ListMode::Today => due_date == today,
            ListMode::Upcoming => due_date > today,
            ListMode::Overdue => task_due_moment(task, now_local.offset())? < now_local,
        };

        if matches {
            filtered.push(task.clone());
        }
    }

    filtered.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
    Ok(filtered)
}

/// The instant a task actually falls due, combining its calendar date
/// with the optional time of day (end of day when absent).
pub fn task_due_moment(task: &TaskInstance, offset: UtcOffset) -> Result<OffsetDateTime, AppError> {
    let due_date = parse_due_date(&task.due_date)?;
    let due_time = match task.due_time.as_deref() {
        Some(value) => Some(parse_due_time(value)?),
        None => None,
    };
    Ok(schedule::due_moment(due_date, due_time, offset))
}

pub fn task_overdue(task: &TaskInstance, now: OffsetDateTime) -> Result<bool, AppError> {
    if task.status != TaskStatus::Pending {
        return Ok(false);
    }
    let offset = now.offset();
    Ok(task_due_moment(task, offset)? < now)
}

/// Raw progress ratio for a pending instance at `now`. Missing
/// progress-start means progress is measured from `now` itself, i.e. the
/// bar starts empty unless the task is already due.
pub fn task_progress(task: &TaskInstance, now: OffsetDateTime) -> Result<f64, AppError> {
    let start = match task.progress_start_at.as_deref() {
        Some(value) => OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|_| AppError::invalid_data("progress_start_at must be RFC3339"))?,
        None => now,
    };
    let due = task_due_moment(task, now.offset())?;
    Ok(schedule::progress_fraction(start, due, now))
}

fn mutate_task<F>(path: &Path, id: &str, mut apply: F) -> Result<TaskInstance, AppError>
where
    F: FnMut(&mut TaskInstance) -> Result<(), AppError>,
{
    let trimmed_id = required_id(id)?;

    let mut state = json_store::load_state(path)?;
    let mut updated_task = None;

    for task in &mut state.tasks {
        if task.id == trimmed_id {
            apply(task)?;
            updated_task = Some(task.clone());
            break;
        }
    }

    let updated = updated_task.ok_or_else(|| AppError::not_found("task not found"))?;
    json_store::save_state(path, &state)?;

    Ok(updated)
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn fresh_id(prefix: &str) -> String {
    format!("{prefix}-{}", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

fn parse_due_date(value: &str) -> Result<Date, AppError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid_input("due date must be YYYY-MM-DD"))
}

fn parse_due_time(value: &str) -> Result<Time, AppError> {
    Time::parse(value.trim(), TIME_FORMAT)
        .map_err(|_| AppError::invalid_input("due time must be HH:MM"))
}

fn format_date(date: Date) -> Result<String, AppError> {
    date.format(DATE_FORMAT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn format_time_of_day(time: Time) -> Result<String, AppError> {
    time.format(TIME_FORMAT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn format_rfc3339(moment: OffsetDateTime) -> Result<String, AppError> {
    moment
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
