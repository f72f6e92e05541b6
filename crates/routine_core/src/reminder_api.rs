use crate::error::AppError;
use crate::model::{Reminder, ReminderStatus, TimerMode};
use crate::notify::{Notifier, activation_argument, notifier_from_env};
use crate::storage::json_store;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug)]
pub struct NotificationOutcome {
    pub reminders: Vec<Reminder>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub reminder_id: String,
    pub error: AppError,
}

pub fn add_reminder(
    title: &str,
    scheduled_at: &str,
    description: Option<&str>,
) -> Result<Reminder, AppError> {
    let path = json_store::store_path()?;
    add_reminder_with_path(&path, title, scheduled_at, description)
}

fn add_reminder_with_path(
    path: &Path,
    title: &str,
    scheduled_at: &str,
    description: Option<&str>,
) -> Result<Reminder, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let parsed = OffsetDateTime::parse(scheduled_at.trim(), &Rfc3339)
        .map_err(|_| AppError::invalid_input("scheduled_at must be RFC3339"))?;
    let scheduled_at = parsed
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    let reminder = Reminder {
        id: format!("rem-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        title: trimmed.to_string(),
        description: description
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
        scheduled_at,
        status: ReminderStatus::Pending,
        pinned: false,
        timer: TimerMode::None,
        color: None,
        icon: None,
    };

    let mut state = json_store::load_state(path)?;
    state.reminders.push(reminder.clone());
    json_store::save_state(path, &state)?;

    Ok(reminder)
}

/// Flip a reminder between pending and done.
pub fn toggle_reminder(id: &str) -> Result<Reminder, AppError> {
    let path = json_store::store_path()?;
    toggle_reminder_with_path(&path, id)
}

fn toggle_reminder_with_path(path: &Path, id: &str) -> Result<Reminder, AppError> {
    mutate_reminder(path, id, |reminder| {
        reminder.status = match reminder.status {
            ReminderStatus::Pending => ReminderStatus::Done,
            ReminderStatus::Done => ReminderStatus::Pending,
        };
    })
}

pub fn pin_reminder(id: &str, pinned: bool) -> Result<Reminder, AppError> {
    let path = json_store::store_path()?;
    pin_reminder_with_path(&path, id, pinned)
}

fn pin_reminder_with_path(path: &Path, id: &str, pinned: bool) -> Result<Reminder, AppError> {
    mutate_reminder(path, id, |reminder| {
        reminder.pinned = pinned;
    })
}

pub fn delete_reminder(id: &str) -> Result<Reminder, AppError> {
    let path = json_store::store_path()?;
    delete_reminder_with_path(&path, id)
}

fn delete_reminder_with_path(path: &Path, id: &str) -> Result<Reminder, AppError> {
    let trimmed_id = required_id(id)?;

    let mut state = json_store::load_state(path)?;
    let index = state
        .reminders
        .iter()
        .position(|reminder| reminder.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("reminder not found"))?;

    let removed = state.reminders.remove(index);
    json_store::save_state(path, &state)?;

    Ok(removed)
}

/// All reminders, pinned ones first, then by scheduled time.
pub fn list_reminders() -> Result<Vec<Reminder>, AppError> {
    let path = json_store::store_path()?;
    list_reminders_with_path(&path)
}

fn list_reminders_with_path(path: &Path) -> Result<Vec<Reminder>, AppError> {
    let mut reminders = json_store::load_state(path)?.reminders;
    reminders.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then(a.scheduled_at.cmp(&b.scheduled_at))
            .then(a.id.cmp(&b.id))
    });
    Ok(reminders)
}

/// Fire a desktop notification for every pending reminder whose scheduled
/// time has passed. Failures are collected per reminder so one broken
/// notification does not abort the batch.
pub fn notify_due_reminders() -> Result<NotificationOutcome, AppError> {
    let path = json_store::store_path()?;
    let notifier = notifier_from_env()?;
    notify_due_reminders_with_path(&path, notifier.as_ref(), OffsetDateTime::now_utc())
}

fn notify_due_reminders_with_path(
    path: &Path,
    notifier: &dyn Notifier,
    now: OffsetDateTime,
) -> Result<NotificationOutcome, AppError> {
    let state = json_store::load_state(path)?;
    let mut notified = Vec::new();
    let mut failures = Vec::new();

    for reminder in &state.reminders {
        if reminder.status != ReminderStatus::Pending {
            continue;
        }

        let scheduled = OffsetDateTime::parse(&reminder.scheduled_at, &Rfc3339)
            .map_err(|_| AppError::invalid_data("scheduled_at must be RFC3339"))?;
        if scheduled > now {
            continue;
        }

        let action = activation_argument(&reminder.id);
        match notifier.notify_with_action(reminder, &action) {
            Ok(_) => notified.push(reminder.clone()),
            Err(err) => failures.push(NotificationFailure {
                reminder_id: reminder.id.clone(),
                error: err,
            }),
        }
    }

    Ok(NotificationOutcome {
        reminders: notified,
        failures,
    })
}

fn mutate_reminder<F>(path: &Path, id: &str, apply: F) -> Result<Reminder, AppError>
where
    F: FnOnce(&mut Reminder),
{
    let trimmed_id = required_id(id)?;

    let mut state = json_store::load_state(path)?;
    let mut updated = None;

    for reminder in &mut state.reminders {
        if reminder.id == trimmed_id {
            apply(reminder);
            updated = Some(reminder.clone());
            break;
        }
    }

    let updated = updated.ok_or_else(|| AppError::not_found("reminder not found"))?;
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
