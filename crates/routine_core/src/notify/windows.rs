use crate::error::AppError;
use crate::model::Reminder;
use crate::notify::{Notifier, launch_mark_done, parse_activation_argument};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(reminder, "")
    }

    fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
        let reminder_id = reminder.id.clone();
        let action_value = action.to_string();
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title("routine")
            .text1(&reminder.title)
            .text2(reminder.description.as_deref().unwrap_or(&reminder.id));

        if !action_value.trim().is_empty() {
            toast = toast.add_button("Done", &action_value);
        }

        let action_match = action_value.clone();
        toast
            .on_activated(move |args| {
                match args {
                    Some(args) => {
                        if !action_match.is_empty() && args == action_match {
                            let _ = launch_mark_done(&reminder_id);
                        } else if let Some(id) = parse_activation_argument(&args) {
                            let _ = launch_mark_done(&id);
                        } else if args.trim().is_empty() {
                            let _ = launch_mark_done(&reminder_id);
                        }
                    }
                    None => {
                        let _ = launch_mark_done(&reminder_id);
                    }
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
