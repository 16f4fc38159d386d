use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use great_core::error::ApiError;
use great_core::models::{MergeStats, SyncReport};
use great_core::service::MomentService;
use great_core::sync::Backoff;

use crate::api::PraiseClient;

const PAGE_SIZE: i64 = 100;
const MAX_PAGES: u32 = 50;
const SUMMARY_DAYS: i64 = 30;

#[derive(Serialize)]
struct SyncOutput {
    #[serde(flatten)]
    report: SyncReport,
    merged: MergeStats,
    summaries_refreshed: usize,
}

pub(crate) async fn cmd_sync(
    service: &MomentService,
    api: &PraiseClient,
    full: bool,
    json: bool,
) -> Result<()> {
    if full {
        service.reset_timeline_cursor()?;
    }

    let report = service.sync_pending(api)?;
    let merged = pull_timeline(service, api).await?;

    // Summary refresh is best effort; a failure never fails the sync.
    let summaries_refreshed = service.refresh_summaries(api, SUMMARY_DAYS).unwrap_or(0);

    if json {
        let output = SyncOutput {
            report,
            merged,
            summaries_refreshed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let pushed = report.pushed;
    let updated = report.updated;
    let deleted = report.deleted;
    println!("Pushed {pushed} new, {updated} edited, {deleted} deleted");
    let inserted = merged.inserted;
    let merged_updates = merged.updated;
    println!("Pulled {inserted} new, {merged_updates} updated from the server");
    if summaries_refreshed > 0 {
        println!("Refreshed {summaries_refreshed} day summaries");
    }
    for error in &report.errors {
        eprintln!("  sync error: {error}");
    }
    if report.restricted {
        eprintln!("Daily moment limit reached. Remaining moments stay local for now.");
    }
    Ok(())
}

/// Pull timeline pages until the cursor runs out, retrying transient
/// failures with jittered exponential backoff.
async fn pull_timeline(service: &MomentService, api: &PraiseClient) -> Result<MergeStats> {
    let mut merged = MergeStats::default();
    let mut backoff = Backoff::default();
    let mut pages = 0;

    loop {
        match service.refresh_timeline(api, PAGE_SIZE) {
            Ok((stats, _)) => {
                merged.inserted += stats.inserted;
                merged.updated += stats.updated;
                merged.skipped += stats.skipped;
                pages += 1;
                if pages >= MAX_PAGES || !service.has_timeline_cursor()? {
                    return Ok(merged);
                }
            }
            Err(e) => {
                let retryable = e
                    .downcast_ref::<ApiError>()
                    .is_some_and(ApiError::is_retryable);
                let Some(delay) = backoff.next_delay().filter(|_| retryable) else {
                    return Err(e);
                };
                let jitter = Duration::from_millis(rand::rng().random_range(0..250_u64));
                tokio::time::sleep(delay + jitter).await;
            }
        }
    }
}
