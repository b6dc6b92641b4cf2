pub mod control;
pub mod process;
pub mod report;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{
        start_daemon,
        storage::{stats_store::JsonStatsStore, STATS_FILE_NAME},
    },
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Webtally", version, long_about = None)]
#[command(about = "Tracks time, clicks and keystrokes per website", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Display collected statistics per website")]
    Stats {},
    #[command(about = "Export collected statistics as a json file")]
    Export {
        #[arg(
            long,
            short,
            help = "Output file. Defaults to website-stats-<today>.json in the current directory"
        )]
        output: Option<PathBuf>,
    },
    #[command(about = "Delete all collected statistics and re-enable tracking")]
    Reset {
        #[arg(long, help = "Confirm that all statistics should be deleted")]
        yes: bool,
    },
    #[command(about = "Turn tracking on or off. Requires a running daemon")]
    Toggle {},
    #[command(about = "Show whether tracking is currently enabled. Requires a running daemon")]
    Status {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = create_application_default_path()?;
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init { .. } => {
            restart_server()?;
            Ok(())
        }
        Commands::Stop {} => {
            let process_name = env::current_exe().expect("Can't operate without an executable");
            kill_previous_servers(&process_name);
            Ok(())
        }
        Commands::Serve { dir } => {
            start_daemon(dir.unwrap_or(app_dir)).await?;
            Ok(())
        }
        Commands::Stats {} => {
            let store = JsonStatsStore::new(app_dir.join(STATS_FILE_NAME))?;
            report::print_stats(&store).await
        }
        Commands::Export { output } => {
            let store = JsonStatsStore::new(app_dir.join(STATS_FILE_NAME))?;
            report::export_stats(&store, output).await
        }
        Commands::Reset { yes } => {
            let store = JsonStatsStore::new(app_dir.join(STATS_FILE_NAME))?;
            report::reset_stats(&store, yes).await
        }
        Commands::Toggle {} => {
            let is_tracking = control::request_toggle(&app_dir).await?;
            println!(
                "Tracking is now {}",
                if is_tracking { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Commands::Status {} => {
            let is_tracking = control::request_status(&app_dir).await?;
            println!(
                "Tracking is {}",
                if is_tracking { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}
