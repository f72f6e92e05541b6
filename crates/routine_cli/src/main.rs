use clap::{CommandFactory, Parser};
use routine_cli::cli::{
    Cli, Command, ConfigOverrideTarget, ListCommand, RemindCommand, RoutineCommand,
    parse_config_override,
};
use routine_core::config::{self, Config, ConfigOverrides, Palette};
use routine_core::error::AppError;
use routine_core::model::{Reminder, ReminderStatus, TaskInstance, TaskStatus};
use routine_core::routine::RoutineStats;
use routine_core::schedule;
use routine_core::{reminder_api, task_api};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::{OffsetDateTime, UtcOffset};

const PROGRESS_BAR_WIDTH: usize = 10;

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Completed => "completed",
        TaskStatus::NotDone => "not_done",
    }
}

fn reminder_status_label(status: ReminderStatus) -> &'static str {
    match status {
        ReminderStatus::Pending => "pending",
        ReminderStatus::Done => "done",
    }
}

fn local_now() -> OffsetDateTime {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset)
}

fn due_label(task: &TaskInstance) -> String {
    match task.due_time.as_deref() {
        Some(time) => format!("{} {}", task.due_date, time),
        None => task.due_date.clone(),
    }
}

fn print_tasks_plain(
    tasks: &[TaskInstance],
    palette: &Palette,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    for task in tasks {
        let overdue = task_api::task_overdue(task, now)?;
        let status = if overdue {
            format!("{} (overdue)", status_label(task.status))
        } else {
            status_label(task.status).to_string()
        };
        let due_moment = task_api::task_due_moment(task, now.offset())?;
        let relative = schedule::format_relative_future(due_moment, now);
        println!(
            "{} | {} | {} | due {} | {}",
            palette.dim(&task.id),
            palette.highlight(&task.title),
            status,
            due_label(task),
            relative
        );
    }

    Ok(())
}

fn print_tasks_json(tasks: &[TaskInstance], now: OffsetDateTime) -> Result<(), AppError> {
    let mut payload = Vec::with_capacity(tasks.len());
    for task in tasks {
        let overdue = task_api::task_overdue(task, now)?;
        payload.push(serde_json::json!({
            "id": task.id,
            "title": task.title,
            "status": task.status,
            "due_date": task.due_date,
            "due_time": task.due_time,
            "overdue": overdue,
            "routine_group_id": task.routine_group_id,
        }));
    }
    println!("{}", serde_json::Value::Array(payload));
    Ok(())
}

fn print_task_json(task: &TaskInstance) {
    let json = serde_json::json!({
        "id": task.id,
        "title": task.title,
        "status": task.status,
        "created_at": task.created_at,
        "due_date": task.due_date,
        "due_time": task.due_time,
        "completed_at": task.completed_at,
        "not_done_reason": task.not_done_reason,
        "points": task.points,
        "progress_start_at": task.progress_start_at,
        "routine_group_id": task.routine_group_id,
        "postpone_count": task.postpone_count,
    });
    println!("{}", json);
}

fn print_reminder_json(reminder: &Reminder) {
    let json = serde_json::json!({
        "id": reminder.id,
        "title": reminder.title,
        "description": reminder.description,
        "scheduled_at": reminder.scheduled_at,
        "status": reminder.status,
        "pinned": reminder.pinned,
        "timer": reminder.timer,
    });
    println!("{}", json);
}

fn progress_bar(display: f64) -> String {
    let filled = (display * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    let mut bar = String::with_capacity(PROGRESS_BAR_WIDTH + 2);
    bar.push('[');
    for index in 0..PROGRESS_BAR_WIDTH {
        bar.push(if index < filled { '#' } else { '.' });
    }
    bar.push(']');
    bar
}

fn countdown_label(countdown: &schedule::Countdown) -> String {
    let parts: Vec<String> = countdown
        .parts
        .iter()
        .map(|part| format!("{} {}", part.value, part.unit.label()))
        .collect();
    let joined = parts.join(" ");
    if countdown.overdue {
        format!("overdue by {joined}")
    } else {
        joined
    }
}

fn show_task(task: &TaskInstance, palette: &Palette, json: bool) -> Result<(), AppError> {
    let now = local_now();
    let fraction = task_api::task_progress(task, now)?;
    let display = schedule::display_fraction(fraction);
    let overdue = fraction > 1.0;
    let due_moment = task_api::task_due_moment(task, now.offset())?;
    let countdown = schedule::countdown_units(due_moment - now);
    let relative = schedule::format_relative_future(due_moment, now);

    if json {
        let parts: Vec<serde_json::Value> = countdown
            .parts
            .iter()
            .map(|part| {
                serde_json::json!({
                    "value": part.value,
                    "unit": part.unit.label(),
                })
            })
            .collect();
        let json = serde_json::json!({
            "id": task.id,
            "title": task.title,
            "status": task.status,
            "due_date": task.due_date,
            "due_time": task.due_time,
            "not_done_reason": task.not_done_reason,
            "completed_at": task.completed_at,
            "points": task.points,
            "postpone_count": task.postpone_count,
            "routine_group_id": task.routine_group_id,
            "progress": fraction,
            "progress_display": display,
            "overdue": overdue,
            "countdown": parts,
        });
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{} | {}",
        palette.dim(&task.id),
        palette.highlight(&task.title)
    );
    println!("status: {}", status_label(task.status));
    println!("due: {} ({})", due_label(task), relative);
    if let Some(reason) = task.not_done_reason.as_deref() {
        println!("skipped: {}", reason);
    }
    if let Some(completed_at) = task.completed_at.as_deref() {
        println!("completed: {}", completed_at);
    }
    println!(
        "progress: {:.0}% {}{}",
        display * 100.0,
        progress_bar(display),
        if overdue { " (overdue)" } else { "" }
    );
    println!("countdown: {}", countdown_label(&countdown));
    if task.postpone_count > 0 {
        println!("postponed: {} time(s)", task.postpone_count);
    }

    Ok(())
}

#[derive(Tabled)]
struct StatsRow {
    metric: &'static str,
    value: String,
}

fn print_stats_table(stats: &RoutineStats) {
    let rows = vec![
        StatsRow {
            metric: "group",
            value: stats.group_id.clone(),
        },
        StatsRow {
            metric: "total",
            value: stats.total.to_string(),
        },
        StatsRow {
            metric: "completed",
            value: stats.completed.to_string(),
        },
        StatsRow {
            metric: "upcoming",
            value: stats.upcoming.to_string(),
        },
        StatsRow {
            metric: "skipped",
            value: stats.skipped.to_string(),
        },
        StatsRow {
            metric: "points",
            value: stats.points_balance.to_string(),
        },
        StatsRow {
            metric: "streak",
            value: stats.current_streak.to_string(),
        },
        StatsRow {
            metric: "avg interval",
            value: format!("{:.1} days", stats.average_interval_days),
        },
        StatsRow {
            metric: "last completed",
            value: stats.last_completed_at.clone().unwrap_or_else(|| "-".to_string()),
        },
        StatsRow {
            metric: "next due",
            value: stats.next_due_date.clone().unwrap_or_else(|| "-".to_string()),
        },
    ];

    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_stats_json(stats: &RoutineStats) {
    let json = serde_json::json!({
        "group_id": stats.group_id,
        "total": stats.total,
        "completed": stats.completed,
        "upcoming": stats.upcoming,
        "skipped": stats.skipped,
        "points_balance": stats.points_balance,
        "average_interval_days": stats.average_interval_days,
        "current_streak": stats.current_streak,
        "last_completed_at": stats.last_completed_at,
        "next_due_date": stats.next_due_date,
    });
    println!("{}", json);
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn expand_alias(args: Vec<String>, aliases: &std::collections::HashMap<String, String>) -> Vec<String> {
    let Some(first) = args.first() else {
        return args;
    };
    let Some(expansion) = aliases.get(first) else {
        return args;
    };

    let mut expanded: Vec<String> = expansion.split_whitespace().map(str::to_string).collect();
    expanded.extend(args.into_iter().skip(1));
    expanded
}

fn build_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        let parsed = parse_config_override(raw).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
            ConfigOverrideTarget::DefaultDueTime => {
                overrides.default_due_time = Some(parsed.value)
            }
        }
    }
    Ok(overrides)
}

fn effective_config(cli: &Cli) -> Result<Config, AppError> {
    let load = config::load_config_with_fallback();
    if let Some(err) = load.error {
        eprintln!("WARNING: using default config: {}", err);
    }
    let overrides = build_overrides(&cli.config_override)?;
    Ok(config::merge_overrides(&load.config, &overrides))
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(cli: Cli, config: &Config) -> Result<(), AppError> {
    let palette = config::palette_for_theme(config.theme.as_deref());

    match cli.command {
        Command::Add {
            title,
            due_date,
            time,
        } => {
            let due_time = time.or_else(|| config.default_due_time.clone());
            let task = task_api::add_task(&title, &due_date, due_time.as_deref())?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Added task: {} ({}) due {}", task.title, task.id, due_label(&task));
            }
        }
        Command::Edit { id, new_title } => {
            let task = task_api::edit_task(&id, &new_title)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Updated task: {} ({})", task.title, task.id);
            }
        }
        Command::Delete { id } => {
            let task = task_api::delete_task(&id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Deleted task: {} ({})", task.title, task.id);
            }
        }
        Command::Show { id } => {
            let task = task_api::get_task_by_id(&id)?;
            show_task(&task, &palette, cli.json)?;
        }
        Command::Done { id } => {
            let task = task_api::complete_task(&id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!(
                    "Completed task: {} ({}) +{} points",
                    task.title, task.id, task.points
                );
            }
        }
        Command::Skip { id, reason } => {
            let task = task_api::skip_task(&id, &reason)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!(
                    "Skipped task: {} ({}) {} points",
                    task.title, task.id, task.points
                );
            }
        }
        Command::Undo { id } => {
            let task = task_api::undo_task(&id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Reverted task: {} ({})", task.title, task.id);
            }
        }
        Command::Postpone { id, due_date } => {
            let task = task_api::postpone_task(&id, &due_date)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!(
                    "Postponed task: {} ({}) to {} ({} time(s) so far)",
                    task.title, task.id, task.due_date, task.postpone_count
                );
            }
        }
        Command::Plan { id, interval_days } => {
            let task = task_api::plan_forward(&id, interval_days)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!(
                    "Planned next instance: {} ({}) due {}",
                    task.title, task.id, task.due_date
                );
            }
        }
        Command::Routine { routine } => match routine {
            RoutineCommand::Stats { group_id } => {
                let stats = task_api::routine_stats(&group_id)?;
                if cli.json {
                    print_stats_json(&stats);
                } else {
                    print_stats_table(&stats);
                }
            }
            RoutineCommand::Timeline { group_id } => {
                let instances = task_api::routine_instances(&group_id)?;
                let now = local_now();
                if cli.json {
                    print_tasks_json(&instances, now)?;
                } else if instances.is_empty() {
                    println!("No instances for routine {group_id}");
                } else {
                    print_tasks_plain(&instances, &palette, now)?;
                }
            }
            RoutineCommand::Delete { group_id } => {
                let removed = task_api::delete_routine(&group_id)?;
                if cli.json {
                    println!("{}", serde_json::json!({ "deleted": removed }));
                } else {
                    println!("Deleted routine {group_id}: {removed} instance(s)");
                }
            }
        },
        Command::List { list } => {
            let tasks = match list {
                ListCommand::Today => task_api::list_today()?,
                ListCommand::Upcoming => task_api::list_upcoming()?,
                ListCommand::Overdue => task_api::list_overdue()?,
            };
            let now = local_now();
            if cli.json {
                print_tasks_json(&tasks, now)?;
            } else {
                print_tasks_plain(&tasks, &palette, now)?;
            }
        }
        Command::Remind { remind } => match remind {
            RemindCommand::Add {
                title,
                scheduled_at,
                description,
            } => {
                let reminder =
                    reminder_api::add_reminder(&title, &scheduled_at, description.as_deref())?;
                if cli.json {
                    print_reminder_json(&reminder);
                } else {
                    println!(
                        "Added reminder: {} ({}) at {}",
                        reminder.title, reminder.id, reminder.scheduled_at
                    );
                }
            }
            RemindCommand::Done { id } => {
                let reminder = reminder_api::toggle_reminder(&id)?;
                if cli.json {
                    print_reminder_json(&reminder);
                } else {
                    println!(
                        "Reminder {} ({}) is now {}",
                        reminder.title,
                        reminder.id,
                        reminder_status_label(reminder.status)
                    );
                }
            }
            RemindCommand::Pin { id, clear } => {
                let reminder = reminder_api::pin_reminder(&id, !clear)?;
                if cli.json {
                    print_reminder_json(&reminder);
                } else if reminder.pinned {
                    println!("Pinned reminder: {} ({})", reminder.title, reminder.id);
                } else {
                    println!("Unpinned reminder: {} ({})", reminder.title, reminder.id);
                }
            }
            RemindCommand::Delete { id } => {
                let reminder = reminder_api::delete_reminder(&id)?;
                if cli.json {
                    print_reminder_json(&reminder);
                } else {
                    println!("Deleted reminder: {} ({})", reminder.title, reminder.id);
                }
            }
            RemindCommand::List => {
                let reminders = reminder_api::list_reminders()?;
                let now = local_now();
                if cli.json {
                    let payload: Vec<serde_json::Value> = reminders
                        .iter()
                        .map(|reminder| {
                            serde_json::json!({
                                "id": reminder.id,
                                "title": reminder.title,
                                "scheduled_at": reminder.scheduled_at,
                                "status": reminder.status,
                                "pinned": reminder.pinned,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::Value::Array(payload));
                } else {
                    for reminder in &reminders {
                        let scheduled = OffsetDateTime::parse(
                            &reminder.scheduled_at,
                            &time::format_description::well_known::Rfc3339,
                        )
                        .map_err(|_| AppError::invalid_data("scheduled_at must be RFC3339"))?;
                        let relative = match reminder.status {
                            ReminderStatus::Pending => {
                                schedule::format_relative_future(scheduled, now)
                            }
                            ReminderStatus::Done => schedule::format_relative_past(scheduled, now),
                        };
                        println!(
                            "{}{} | {} | {} | {}",
                            if reminder.pinned { "[PIN] " } else { "" },
                            palette.dim(&reminder.id),
                            palette.highlight(&reminder.title),
                            reminder_status_label(reminder.status),
                            relative
                        );
                    }
                }
            }
        },
        Command::Notify => {
            let outcome = reminder_api::notify_due_reminders()?;
            if cli.json {
                let json = serde_json::json!({
                    "notified": outcome.reminders.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
                    "failures": outcome
                        .failures
                        .iter()
                        .map(|failure| {
                            serde_json::json!({
                                "reminder_id": failure.reminder_id,
                                "error": failure.error.code(),
                            })
                        })
                        .collect::<Vec<_>>(),
                });
                println!("{}", json);
            } else {
                println!("Notified {} reminder(s)", outcome.reminders.len());
                for failure in &outcome.failures {
                    eprintln!("WARNING: {}: {}", failure.reminder_id, failure.error);
                }
            }
        }
    }

    Ok(())
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let args = expand_alias(args, &config.aliases);

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("routine".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        // Overrides typed on the line apply to that command only.
        let line_config = match build_overrides(&cli.config_override) {
            Ok(overrides) => config::merge_overrides(config, &overrides),
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if let Err(err) = run_command(cli, &line_config) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let load = config::load_config_with_fallback();
        if let Some(err) = load.error {
            eprintln!("WARNING: using default config: {}", err);
        }
        if let Err(err) = run_interactive(&load.config) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                print!("{err}");
                return;
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let config = match effective_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, &config) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
