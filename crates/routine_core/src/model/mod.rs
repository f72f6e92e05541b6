mod reminder;
mod task;

pub use reminder::{Reminder, ReminderStatus, TimerMode};
pub use task::{TaskInstance, TaskStatus};
