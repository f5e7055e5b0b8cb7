// Scoresheet CLI - batch reconciliation of scoring plays across feeds

mod exit_codes;
mod recon;
mod report;
mod season;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;
use recon::ReconcileArgs;

#[derive(Parser)]
#[command(name = "scoresheet")]
#[command(about = "Reconcile goal and assist credits from derived feeds against the official scoresheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every game under a directory (or the games named with --game)
    #[command(after_help = "\
Examples:
  scoresheet reconcile games/
  scoresheet reconcile games/ --config nhl.recon.toml --json
  scoresheet reconcile games/ --game 2023020415 --detail
  scoresheet reconcile games/ --jobs 4 --output season.json")]
    Reconcile {
        /// Directory holding one subdirectory per game
        games_dir: PathBuf,

        /// Path to the .recon.toml config (built-in profiles when omitted)
        #[arg(long, short = 'c', env = "SCORESHEET_CONFIG")]
        config: Option<PathBuf>,

        /// Reconcile only this game. Repeatable.
        #[arg(long = "game", value_name = "GAME_ID")]
        games: Vec<String>,

        /// Worker threads (0 = one per core)
        #[arg(long, short = 'j', default_value_t = 0)]
        jobs: usize,

        /// Output JSON to stdout in addition to the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print every non-perfect player and team per game
        #[arg(long)]
        detail: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  scoresheet validate nhl.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
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

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Reconcile { games_dir, config, games, jobs, json, output, detail } => {
            recon::cmd_reconcile(ReconcileArgs {
                games_dir,
                config,
                games,
                jobs,
                json,
                output,
                detail,
            })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
