use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use great_core::models::Moment;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
        },
    }
}

/// IANA zone name to report with new moments: $TZ when set, UTC otherwise.
pub(crate) fn local_timezone() -> String {
    std::env::var("TZ")
        .ok()
        .filter(|tz| !tz.trim().is_empty() && !tz.contains(char::is_whitespace))
        .unwrap_or_else(|| "UTC".to_string())
}

pub(crate) fn moment_time(moment: &Moment) -> String {
    DateTime::parse_from_rfc3339(&moment.created_at)
        .map_or_else(|_| "--:--".to_string(), |dt| dt.format("%H:%M").to_string())
}

pub(crate) fn print_moment_line(moment: &Moment) {
    let id = moment.id;
    let time = moment_time(moment);
    let content = truncate(&moment.content, 100);
    let star = if moment.favorite { " ★" } else { "" };
    let pending = if moment.synced { "" } else { " (not synced)" };
    println!("  [{id}] {time}  {content}{star}{pending}");
    if !moment.tags.is_empty() {
        let tags = moment.tags.join(" #");
        println!("         #{tags}");
    }
    if let Some(praise) = moment.display_praise() {
        println!("         \u{201c}{praise}\u{201d}");
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s
            .char_indices()
            .nth(max.saturating_sub(3))
            .map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
