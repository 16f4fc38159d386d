mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::api::PraiseClient;
use crate::commands::{
    cmd_delete, cmd_favorite, cmd_feedback, cmd_galaxy, cmd_list, cmd_log, cmd_stats, cmd_summary,
    cmd_sync,
};
use crate::config::Config;
use great_core::service::MomentService;

#[derive(Parser)]
#[command(
    name = "great",
    version,
    about = "A local-first journal for logging small wins",
    long_about = "\n\n   ██████╗ ██████╗ ███████╗ █████╗ ████████╗
  ██╔════╝ ██╔══██╗██╔════╝██╔══██╗╚══██╔══╝
  ██║  ███╗██████╔╝█████╗  ███████║   ██║
  ██║   ██║██╔══██╗██╔══╝  ██╔══██║   ██║
  ╚██████╔╝██║  ██║███████╗██║  ██║   ██║
   ╚═════╝ ╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝   ╚═╝
        you are doing great.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a moment (saved locally first, then praised by the server)
    Log {
        /// What you did
        content: String,
        /// Tag the moment (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// IANA timezone to record (default: $TZ, then UTC)
        #[arg(long)]
        timezone: Option<String>,
        /// Save locally without contacting the server
        #[arg(long)]
        offline: bool,
        /// Do not wait for server praise
        #[arg(long)]
        no_wait: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List moments, newest first, grouped by day
    List {
        /// Maximum number of moments to show
        #[arg(short, long)]
        limit: Option<i64>,
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a moment as a favorite (or remove the mark)
    Favorite {
        /// Moment ID
        id: i64,
        /// Remove the favorite mark instead
        #[arg(long)]
        remove: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a moment locally and on the server
    Delete {
        /// Moment ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending changes and pull the latest from the server
    Sync {
        /// Re-pull the whole timeline instead of resuming from the cursor
        #[arg(long)]
        full: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the summary for a day (default: today)
    Summary {
        /// Date to show (YYYY-MM-DD, today, yesterday)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render your moments as a star map, one star per moment
    Galaxy {
        /// Render width in characters
        #[arg(long, default_value = "72")]
        width: usize,
        /// Render height in characters
        #[arg(long, default_value = "24")]
        height: usize,
        /// Output the layout as JSON instead of rendering
        #[arg(long)]
        json: bool,
    },
    /// Show journaling stats
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send feedback to the people who run the service
    Feedback {
        /// Your message
        message: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = MomentService::new(&config.db_path)?;
    let user_id = service.anon_user_id()?;
    let client = PraiseClient::new(&config.base_url, config.app_token.as_deref(), &user_id);

    match cli.command {
        Commands::Log {
            content,
            tags,
            timezone,
            offline,
            no_wait,
            json,
        } => {
            let api = if offline { None } else { Some(&client) };
            cmd_log(&service, api, &content, &tags, timezone, no_wait, json).await
        }
        Commands::List {
            limit,
            favorites,
            json,
        } => cmd_list(&service, limit, favorites, json),
        Commands::Favorite { id, remove, json } => {
            cmd_favorite(&service, &client, id, remove, json)
        }
        Commands::Delete { id, json } => cmd_delete(&service, &client, id, json),
        Commands::Sync { full, json } => cmd_sync(&service, &client, full, json).await,
        Commands::Summary { date, json } => cmd_summary(&service, &client, date, json),
        Commands::Galaxy {
            width,
            height,
            json,
        } => cmd_galaxy(&service, width, height, json),
        Commands::Stats { json } => cmd_stats(&service, &client, json),
        Commands::Feedback { message, json } => cmd_feedback(&client, &message, json),
    }
}
