//! Time formatting utilities.
//!
//! Both helpers take `now` explicitly so schedule listings render against
//! the same instant the scheduler evaluated.

use chrono::{DateTime, Utc};

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Countdown to a future time, e.g. `in 3h 20m`.
#[must_use]
pub fn format_countdown(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = target.signed_duration_since(now);
    if remaining.num_seconds() <= 0 {
        return "now".to_string();
    }

    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours >= 48 {
        let days = hours / 24;
        format!("in {days} day{}", plural(days))
    } else if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        format!("in {}s", remaining.num_seconds())
    }
}

/// Relative time, e.g. `2 hours ago`.
#[must_use]
pub fn format_relative_time(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(target);
    if elapsed.num_seconds().abs() < 60 {
        return "just now".to_string();
    }

    let suffix = if elapsed.num_seconds() > 0 { "ago" } else { "from now" };
    let days = elapsed.num_days().abs();
    let hours = elapsed.num_hours().abs();
    let minutes = elapsed.num_minutes().abs();

    if days > 0 {
        format!("{days} day{} {suffix}", plural(days))
    } else if hours > 0 {
        format!("{hours} hour{} {suffix}", plural(hours))
    } else {
        format!("{minutes} minute{} {suffix}", plural(minutes))
    }
}
