use anyhow::Result;
use std::process;

use great_core::service::MomentService;

use crate::api::PraiseClient;

use super::helpers::parse_date;

pub(crate) fn cmd_summary(
    service: &MomentService,
    api: &PraiseClient,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;

    // Refresh the cache opportunistically; the local fallback covers offline.
    let _ = service.refresh_summaries(api, 7);
    let summary = service.summary_for(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.moment_count == 0 {
        let date = &summary.date;
        eprintln!("No moments for {date}");
        process::exit(2);
    }

    let date = &summary.date;
    println!("=== {date} ===\n");

    if let Some(text) = &summary.summary {
        println!("  {text}\n");
    }

    let count = summary.moment_count;
    let morning = summary.morning;
    let afternoon = summary.afternoon;
    let evening = summary.evening;
    let night = summary.night;
    println!("  MOMENTS: {count} | morning {morning}, afternoon {afternoon}, evening {evening}, night {night}");

    if !summary.tags.is_empty() {
        let tags = summary.tags.join(" #");
        println!("  TAGS: #{tags}");
    }

    if summary.in_progress {
        println!("\n  (the day is still in progress)");
    }

    Ok(())
}
