//! Pure progress and time-formatting arithmetic for routines.
//!
//! Every function here is total and takes `now` explicitly; nothing reads
//! the system clock. Months are 30 days and years 365 days throughout,
//! which keeps the tiers stable for display purposes.

use crate::model::{TaskInstance, TaskStatus};
use time::macros::time;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub const DEFAULT_DUE_TIME: Time = time!(23:59);

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Fraction of the way from `start` to `due` at `now`.
///
/// Clamped to 0.0 at the low end; values above 1.0 pass through so callers
/// can detect overdue instances. `due <= start` counts as already due.
pub fn progress_fraction(
    start: OffsetDateTime,
    due: OffsetDateTime,
    now: OffsetDateTime,
) -> f64 {
    if due <= start {
        return 1.0;
    }

    let total = (due - start).whole_seconds() as f64;
    let elapsed = (now - start).whole_seconds() as f64;
    let fraction = elapsed / total;
    if fraction < 0.0 { 0.0 } else { fraction }
}

/// Clamp a raw fraction for a progress bar. Kept separate from
/// [`progress_fraction`] so the unclamped value stays usable for overdue
/// detection.
pub fn display_fraction(fraction: f64) -> f64 {
    fraction.min(1.0)
}

/// Combine a calendar due date with an optional time of day, falling back
/// to end of day.
pub fn due_moment(due_date: Date, due_time: Option<Time>, offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(due_date, due_time.unwrap_or(DEFAULT_DUE_TIME)).assume_offset(offset)
}

fn plural(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// Phrase for an elapsed span, without tense. `None` means under a minute.
fn span_phrase(seconds: i64) -> Option<String> {
    if seconds < MINUTE {
        return None;
    }
    if seconds < HOUR {
        return Some(plural(seconds / MINUTE, "minute"));
    }
    if seconds < DAY {
        return Some(plural(seconds / HOUR, "hour"));
    }
    if seconds < MONTH {
        return Some(plural(seconds / DAY, "day"));
    }
    if seconds < YEAR {
        let months = seconds / MONTH;
        let days = (seconds % MONTH) / DAY;
        let mut phrase = plural(months, "month");
        if days > 0 {
            phrase.push(' ');
            phrase.push_str(&plural(days, "day"));
        }
        return Some(phrase);
    }

    let years = seconds / YEAR;
    let months = (seconds % YEAR) / MONTH;
    let mut phrase = plural(years, "year");
    if months > 0 {
        phrase.push(' ');
        phrase.push_str(&plural(months, "month"));
    }
    Some(phrase)
}

/// "Just now", "45 minutes ago", "1 month 10 days ago", ...
///
/// A `date` after `now` clamps to "Just now" rather than producing a
/// negative span.
pub fn format_relative_past(date: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - date).whole_seconds().max(0);
    match span_phrase(seconds) {
        Some(phrase) => format!("{phrase} ago"),
        None => "Just now".to_string(),
    }
}

/// "Now", "In 45 minutes", "In 1 day", ... A `date` already in the past
/// delegates to the past formatter with "ago" replaced by "overdue".
pub fn format_relative_future(date: OffsetDateTime, now: OffsetDateTime) -> String {
    if date < now {
        let past = format_relative_past(date, now);
        return match past.strip_suffix("ago") {
            Some(head) => format!("{head}overdue"),
            None => past,
        };
    }

    let seconds = (date - now).whole_seconds();
    match span_phrase(seconds) {
        Some(phrase) => format!("In {phrase}"),
        None => "Now".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownUnit {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl CountdownUnit {
    pub fn label(self) -> &'static str {
        match self {
            Self::Years => "YRS",
            Self::Months => "MO",
            Self::Days => "DAYS",
            Self::Hours => "HRS",
            Self::Minutes => "MIN",
            Self::Seconds => "SEC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownPart {
    pub value: i64,
    pub unit: CountdownUnit,
}

/// Decomposed remaining time for a live countdown display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    /// Polarity of the original duration; the parts are always positive.
    pub overdue: bool,
    pub parts: Vec<CountdownPart>,
}

/// Break a remaining duration into 3 to 6 display units. Leading zero
/// units are dropped largest-first (years, then months, then days);
/// hours, minutes and seconds are always present. Intended to be
/// re-evaluated once per second by the caller.
pub fn countdown_units(remaining: Duration) -> Countdown {
    let total = remaining.whole_seconds();
    let overdue = total < 0;
    let mut left = total.abs();

    let years = left / YEAR;
    left %= YEAR;
    let months = left / MONTH;
    left %= MONTH;
    let days = left / DAY;
    left %= DAY;
    let hours = left / HOUR;
    left %= HOUR;
    let minutes = left / MINUTE;
    let seconds = left % MINUTE;

    let mut parts = Vec::with_capacity(6);
    if years > 0 {
        parts.push(CountdownPart {
            value: years,
            unit: CountdownUnit::Years,
        });
    }
    if months > 0 || years > 0 {
        parts.push(CountdownPart {
            value: months,
            unit: CountdownUnit::Months,
        });
    }
    if days > 0 || months > 0 || years > 0 {
        parts.push(CountdownPart {
            value: days,
            unit: CountdownUnit::Days,
        });
    }
    parts.push(CountdownPart {
        value: hours,
        unit: CountdownUnit::Hours,
    });
    parts.push(CountdownPart {
        value: minutes,
        unit: CountdownUnit::Minutes,
    });
    parts.push(CountdownPart {
        value: seconds,
        unit: CountdownUnit::Seconds,
    });

    Countdown { overdue, parts }
}

/// Mean gap in days between consecutive completions, 0.0 below two
/// entries. Expects the timestamps sorted ascending.
pub fn average_interval_days(completions: &[OffsetDateTime]) -> f64 {
    if completions.len() < 2 {
        return 0.0;
    }

    let mut total_seconds = 0i64;
    for pair in completions.windows(2) {
        total_seconds += (pair[1] - pair[0]).whole_seconds();
    }

    total_seconds as f64 / (completions.len() - 1) as f64 / DAY as f64
}

/// Consecutive completed instances from the front of a most-recent-first
/// history; stops at the first instance that is not completed.
pub fn current_streak(history: &[TaskInstance]) -> usize {
    history
        .iter()
        .take_while(|task| task.status == TaskStatus::Completed)
        .count()
}
