use anyhow::Result;

use great_core::models::Moment;
use great_core::service::{MomentService, PushOutcome};
use great_core::sync::PollPolicy;

use crate::api::PraiseClient;

use super::helpers::local_timezone;

pub(crate) async fn cmd_log(
    service: &MomentService,
    api: Option<&PraiseClient>,
    content: &str,
    tags: &[String],
    timezone: Option<String>,
    no_wait: bool,
    json: bool,
) -> Result<()> {
    let tz = timezone.unwrap_or_else(local_timezone);
    let moment = service.log_moment(content, tags, &tz)?;

    let Some(api) = api else {
        // Offline by request: the moment waits for the next sync.
        return print_logged(service, &moment, json, None);
    };

    let outcome = match service.push_moment(api, &moment) {
        Ok(outcome) => outcome,
        Err(e) => {
            return print_logged(
                service,
                &service.get_moment(moment.id)?,
                json,
                Some(&format!("Push failed: {e:#}")),
            );
        }
    };

    match outcome {
        PushOutcome::Synced(synced) => {
            if synced.praise.is_some() || no_wait {
                return print_logged(service, &synced, json, None);
            }
            let with_praise = wait_for_praise(service, api, synced).await?;
            print_logged(service, &with_praise, json, None)
        }
        PushOutcome::Restricted(m) => print_logged(
            service,
            &m,
            json,
            Some("Daily moment limit reached. Saved locally; it will sync once posting opens up again."),
        ),
        PushOutcome::Deferred(m, e) => {
            print_logged(service, &m, json, Some(&format!("Saved locally; will sync later ({e})")))
        }
    }
}

/// Poll for server praise at a fixed interval, bounded. Transient poll
/// failures just end the wait; the canned line covers for the server.
async fn wait_for_praise(
    service: &MomentService,
    api: &PraiseClient,
    moment: Moment,
) -> Result<Moment> {
    let policy = PollPolicy::DEFAULT;
    for _ in 0..policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        match service.fetch_praise(api, &moment) {
            Ok(Some(updated)) => return Ok(updated),
            Ok(None) => {}
            Err(_) => break,
        }
    }
    service.get_moment(moment.id)
}

fn print_logged(
    service: &MomentService,
    moment: &Moment,
    json: bool,
    note: Option<&str>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(moment)?);
        return Ok(());
    }
    let content = &moment.content;
    println!("Logged: {content}");
    if let Some(praise) = moment.display_praise() {
        println!("  \u{201c}{praise}\u{201d}");
    }
    if !moment.tags.is_empty() {
        let tags = moment.tags.join(" #");
        println!("  #{tags}");
    }
    if let Some(note) = note {
        eprintln!("{note}");
    } else if service.posting_restricted()? && moment.synced {
        eprintln!("Note: the daily posting limit was reached earlier today.");
    }
    Ok(())
}
