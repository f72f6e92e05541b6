use crate::error::AppError;
use crate::model::Reminder;
use crate::notify::{Notifier, launch_mark_done};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(reminder, "")
    }

    fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary("routine");
        match reminder.description.as_deref() {
            Some(description) => notification.body(&format!("{}\n{}", reminder.title, description)),
            None => notification.body(&reminder.title),
        };
        if !action.trim().is_empty() {
            notification.action(action, "Done");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if !action.trim().is_empty() {
            let action_key = action.to_string();
            let reminder_id = reminder.id.clone();
            std::thread::spawn(move || {
                let _ = handle.wait_for_action(|selected| {
                    if selected == action_key || selected == "default" {
                        let _ = launch_mark_done(&reminder_id);
                    }
                });
            });
        }

        Ok(())
    }
}
