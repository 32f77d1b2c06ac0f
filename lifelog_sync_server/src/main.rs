use chrono::Utc;
use clap::Parser;
use lifelog_sync_core::TriggerResponse;
use lifelog_sync_core::models::parse_timestamp;
use lifelog_sync_core::storage::build_filestore;
use lifelog_sync_server::backends::build_job;
use lifelog_sync_server::cli::{Cli, Commands, load_config};
use lifelog_sync_server::server::{AppState, serve};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // JSON logs on stdout unless LIFELOG_SYNC_LOG_FORMAT=pretty.
    lifelog_sync_core::o11y::init_global_from_env()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Commands::Run { start, local_dir } => {
            let cfg = load_config(local_dir.as_deref())?;
            let start = start.as_deref().map(parse_timestamp).transpose()?;
            let job = build_job(cfg).await?;

            let now = Utc::now();
            let summary = match start {
                Some(start) => job.run_from(start, now).await?,
                None => job.run(now).await?,
            };
            let resp = TriggerResponse::from_summary(summary);
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Serve {
            host,
            port,
            local_dir,
        } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let cfg = load_config(local_dir.as_deref())?;
            let job = build_job(cfg).await?;
            serve(addr, AppState::new(job)).await?;
        }
        Commands::List { prefix, local_dir } => {
            let cfg = load_config(local_dir.as_deref())?;
            let filestore = build_filestore(&cfg.storage).await?;
            for key in filestore.list(&prefix).await? {
                println!("{key}");
            }
        }
        Commands::Config { local_dir } => {
            let cfg = load_config(local_dir.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
        }
    }

    Ok(())
}
