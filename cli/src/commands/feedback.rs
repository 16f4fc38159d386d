use anyhow::{Result, bail};

use crate::api::PraiseClient;
use great_core::service::PraiseApi;

pub(crate) fn cmd_feedback(api: &PraiseClient, message: &str, json: bool) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        bail!("Feedback message must not be empty");
    }

    api.send_feedback(message)?;

    if json {
        println!("{}", serde_json::json!({ "sent": true }));
    } else {
        println!("Thanks! Your feedback is on its way.");
    }
    Ok(())
}
