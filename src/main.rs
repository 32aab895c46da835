use bananasync::commands;
use bananasync::utils;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bananasync")]
#[command(author, version, about = "Keep a local mod folder in sync with GameBanana", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create bananasync.json in the current directory
    Init {
        /// GameBanana game ID
        #[arg(long)]
        game_id: Option<String>,

        /// Directory downloaded files are written to
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// File that records which mods have been synced
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// List every mod published for the configured game
    List {
        /// Only show the first N mods
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the full description and files of a mod
    Info {
        /// GameBanana mod ID
        #[arg(value_name = "MOD_ID")]
        mod_id: String,
    },
    /// Show which mods have been synced locally
    Status,
    /// Download new and updated mods
    Sync {
        /// Print the files that would be downloaded without downloading them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Keep downloading after a file fails instead of stopping
        #[arg(long, default_value_t = false)]
        continue_on_error: bool,

        /// Number of downloads to run at once
        #[arg(long, short)]
        jobs: Option<usize>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let env = utils::RealEnv;

    let result = match cli.command {
        Commands::Init {
            game_id,
            download_dir,
            state_file,
        } => commands::init::run(&env, game_id, download_dir, state_file).await,
        Commands::List { limit } => commands::list::run(&env, limit).await,
        Commands::Info { mod_id } => commands::info::run(&env, &mod_id).await,
        Commands::Status => commands::status::run(&env).await,
        Commands::Sync {
            dry_run,
            continue_on_error,
            jobs,
        } => {
            let options = commands::sync::SyncOptions {
                dry_run,
                continue_on_error,
                jobs,
            };
            commands::sync::run(&env, options).await
        }
    };

    if let Err(err) = result {
        eprintln!("{}", style("[ERROR]").bold().red());
        eprintln!("{:?}", style(err).red());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
