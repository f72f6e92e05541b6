use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: routine add "Water the plants" 2026-01-10
    /// Example: routine add "Water the plants" 2026-01-10 --time 09:00
    Add {
        title: String,
        due_date: String,
        #[arg(long)]
        time: Option<String>,
    },
    /// Edit a task's title
    ///
    /// Example: routine edit task-1 "Water the balcony plants"
    Edit {
        id: String,
        new_title: String,
    },
    /// Delete a task
    ///
    /// Example: routine delete task-1
    Delete {
        id: String,
    },
    /// Show a task with its live progress and countdown
    ///
    /// Example: routine show task-1
    Show {
        id: String,
    },
    /// Mark a task as completed
    ///
    /// Example: routine done task-1
    Done {
        id: String,
    },
    /// Skip a task with a reason
    ///
    /// Example: routine skip task-1 "travelling this week"
    Skip {
        id: String,
        reason: String,
    },
    /// Revert a completion or skip back to pending
    ///
    /// Example: routine undo task-1
    Undo {
        id: String,
    },
    /// Push a task's due date out
    ///
    /// Example: routine postpone task-1 2026-01-15
    Postpone {
        id: String,
        due_date: String,
    },
    /// Plan the next instance of a routine
    ///
    /// Example: routine plan task-1 7
    Plan {
        id: String,
        interval_days: u32,
    },
    /// Inspect or remove a routine group
    Routine {
        #[command(subcommand)]
        routine: RoutineCommand,
    },
    /// List tasks
    ///
    /// Example: routine list today
    List {
        #[command(subcommand)]
        list: ListCommand,
    },
    /// Manage standalone reminders
    Remind {
        #[command(subcommand)]
        remind: RemindCommand,
    },
    /// Send notifications for due reminders
    ///
    /// Example: routine notify
    Notify,
}

#[derive(Subcommand, Debug)]
pub enum RoutineCommand {
    /// Aggregate statistics for a routine group
    ///
    /// Example: routine routine stats routine-1
    Stats {
        group_id: String,
    },
    /// Full instance history of a routine group
    ///
    /// Example: routine routine timeline routine-1
    Timeline {
        group_id: String,
    },
    /// Delete every instance of a routine group
    ///
    /// Example: routine routine delete routine-1
    Delete {
        group_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Pending tasks due today
    Today,
    /// Pending tasks due after today
    Upcoming,
    /// Pending tasks past their due moment
    Overdue,
}

#[derive(Subcommand, Debug)]
pub enum RemindCommand {
    /// Add a reminder
    ///
    /// Example: routine remind add "Call dentist" 2026-01-05T10:00:00Z
    Add {
        title: String,
        scheduled_at: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Toggle a reminder between pending and done
    ///
    /// Example: routine remind done rem-1
    Done {
        id: String,
    },
    /// Pin a reminder to the top of the list, or unpin it
    ///
    /// Example: routine remind pin rem-1
    /// Example: routine remind pin rem-1 --clear
    Pin {
        id: String,
        #[arg(long)]
        clear: bool,
    },
    /// Delete a reminder
    ///
    /// Example: routine remind delete rem-1
    Delete {
        id: String,
    },
    /// List reminders, pinned first
    List,
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Alias(String),
    DefaultDueTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    match canonical_field.as_str() {
        "theme" => {
            if remainder.is_some() {
                Err("theme override cannot have subfields".to_string())
            } else {
                Ok(ParsedConfigOverride {
                    target: ConfigOverrideTarget::Theme,
                    value,
                })
            }
        }
        "default_due_time" => {
            if remainder.is_some() {
                Err("default_due_time override cannot have subfields".to_string())
            } else {
                Ok(ParsedConfigOverride {
                    target: ConfigOverrideTarget::DefaultDueTime,
                    value,
                })
            }
        }
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            Ok(ParsedConfigOverride {
                target: ConfigOverrideTarget::Alias(alias_name.to_string()),
                value,
            })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrideTarget, parse_config_override};

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" THEME = Midnight ").unwrap();

        match parsed.target {
            ConfigOverrideTarget::Theme => {}
            other => panic!("unexpected target: {other:?}"),
        }

        assert_eq!(parsed.value, "Midnight");
    }

    #[test]
    fn parse_config_override_accepts_default_due_time() {
        let parsed = parse_config_override("default-due-time=08:30").unwrap();

        match parsed.target {
            ConfigOverrideTarget::DefaultDueTime => {}
            other => panic!("unexpected target: {other:?}"),
        }

        assert_eq!(parsed.value, "08:30");
    }

    #[test]
    fn parse_config_override_rejects_empty_alias_name() {
        let err = parse_config_override("aliases. = foo").unwrap_err();
        assert!(err.contains("aliases override requires an alias name"));
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("unknown.field=value").unwrap_err();
        assert!(err.contains("unknown config field"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("aliasesls").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn parse_config_override_trims_whitespace_for_alias_names() {
        let parsed = parse_config_override("aliases. ls = list today").unwrap();

        match parsed.target {
            ConfigOverrideTarget::Alias(alias) => assert_eq!(alias, "ls"),
            other => panic!("unexpected target: {other:?}"),
        }

        assert_eq!(parsed.value, "list today");
    }
}
