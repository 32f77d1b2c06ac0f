use clap::{Parser, Subcommand};
use lifelog_sync_core::config::SyncConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "lifelog_sync", version, about = "Catch-up sync of lifelog records into object storage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one sync and print the trigger response (default if no subcommand given).
    Run {
        /// Window start (RFC 3339); defaults to LIFELOG_SYNC_WINDOW_START.
        #[arg(long)]
        start: Option<String>,

        /// Write chunks under this directory instead of S3.
        #[arg(long, env = "LIFELOG_SYNC_LOCAL_DIR")]
        local_dir: Option<PathBuf>,
    },

    /// Start the HTTP trigger.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "LIFELOG_SYNC_PORT", default_value = "8080")]
        port: u16,
        #[arg(long, env = "LIFELOG_SYNC_LOCAL_DIR")]
        local_dir: Option<PathBuf>,
    },

    /// List stored objects.
    List {
        /// Only keys starting with this prefix.
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, env = "LIFELOG_SYNC_LOCAL_DIR")]
        local_dir: Option<PathBuf>,
    },

    /// Print the effective configuration with secrets masked.
    Config {
        #[arg(long, env = "LIFELOG_SYNC_LOCAL_DIR")]
        local_dir: Option<PathBuf>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            start: None,
            local_dir: std::env::var_os("LIFELOG_SYNC_LOCAL_DIR").map(PathBuf::from),
        }
    }
}

/// Loads config from the environment, with `local_dir` taking precedence over
/// any configured destination.
pub fn load_config(local_dir: Option<&Path>) -> lifelog_sync_core::Result<SyncConfig> {
    SyncConfig::from_lookup(|name| match (name, local_dir) {
        ("LIFELOG_SYNC_LOCAL_DIR", Some(dir)) => Some(dir.display().to_string()),
        _ => std::env::var(name).ok(),
    })
}
