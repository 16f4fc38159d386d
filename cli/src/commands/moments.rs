use anyhow::Result;
use std::process;

use great_core::models::group_by_date;
use great_core::service::{MomentService, PraiseApi};

use crate::api::PraiseClient;

use super::helpers::{json_error, print_moment_line};

pub(crate) fn cmd_list(
    service: &MomentService,
    limit: Option<i64>,
    favorites: bool,
    json: bool,
) -> Result<()> {
    let moments = service.list_moments(limit, favorites)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&moments)?);
        return Ok(());
    }

    if moments.is_empty() {
        if favorites {
            eprintln!("No favorites yet. Star one with: great favorite <id>");
        } else {
            eprintln!("No moments yet. Log one with: great log \"I did a thing\"");
        }
        process::exit(2);
    }

    for group in group_by_date(moments) {
        let date = &group.date;
        println!("=== {date} ===");
        for moment in &group.moments {
            print_moment_line(moment);
        }
        println!();
    }

    if service.posting_restricted()? {
        eprintln!("Note: the daily posting limit was reached. New moments stay local until it lifts.");
    }

    Ok(())
}

pub(crate) fn cmd_favorite(
    service: &MomentService,
    api: &PraiseClient,
    id: i64,
    remove: bool,
    json: bool,
) -> Result<()> {
    let moment = service.favorite_moment(Some(api as &dyn PraiseApi), id, !remove)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&moment)?);
        return Ok(());
    }

    let content = &moment.content;
    if moment.favorite {
        println!("Favorited: {content} ★");
    } else {
        println!("Unfavorited: {content}");
    }
    if !moment.synced {
        eprintln!("The change is queued and will reach the server on the next sync.");
    }
    Ok(())
}

pub(crate) fn cmd_delete(service: &MomentService, api: &PraiseClient, id: i64, json: bool) -> Result<()> {
    let moment = match service.get_moment(id) {
        Ok(m) => m,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("No moment with id {id}")));
            } else {
                eprintln!("No moment with id {id}");
            }
            process::exit(2);
        }
    };

    service.delete_moment(Some(api as &dyn PraiseApi), id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        let content = &moment.content;
        println!("Deleted: {content}");
        if service.pending_tombstones()? > 0 {
            eprintln!("The server copy will be removed on the next sync.");
        }
    }
    Ok(())
}
