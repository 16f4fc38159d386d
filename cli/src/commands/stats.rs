use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use great_core::service::{MomentService, PraiseApi};

use crate::api::PraiseClient;

pub(crate) fn cmd_stats(service: &MomentService, api: &PraiseClient, json: bool) -> Result<()> {
    let stats = service.stats(Some(api as &dyn PraiseApi))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Metric")]
        metric: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows = vec![
        StatRow {
            metric: "Moments logged",
            value: stats.total_moments.to_string(),
        },
        StatRow {
            metric: "Favorites",
            value: stats.favorite_count.to_string(),
        },
        StatRow {
            metric: "Current streak",
            value: format!("{} day(s)", stats.current_streak),
        },
        StatRow {
            metric: "Member since",
            value: stats.member_since.unwrap_or_else(|| "-".to_string()),
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
