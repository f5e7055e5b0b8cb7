//! `scoresheet reconcile` and `scoresheet validate`.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use scoresheet_recon::{reconcile, DirectorySource, ReconConfig};

use crate::exit_codes::{
    EXIT_ERROR, EXIT_GAMES_FAILED, EXIT_INVALID_CONFIG, EXIT_MAJOR_DISCREPANCY, EXIT_USAGE,
};
use crate::report::{game_detail, game_line, season_lines, BatchReport, GameOutcome};
use crate::season::SeasonSummary;
use crate::CliError;

pub struct ReconcileArgs {
    pub games_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub games: Vec<String>,
    pub jobs: usize,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub detail: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        debug!("no --config given, using built-in source profiles");
        return Ok(ReconConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_USAGE, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str)
        .map_err(|e| recon_err(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display())))
}

pub fn cmd_reconcile(args: ReconcileArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    if !args.games_dir.is_dir() {
        return Err(recon_err(
            EXIT_USAGE,
            format!("games directory not found: {}", args.games_dir.display()),
        ));
    }

    let source = DirectorySource::new(args.games_dir.clone(), &config)
        .map_err(|e| recon_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    let game_ids = if args.games.is_empty() {
        source
            .game_ids()
            .map_err(|e| recon_err(EXIT_USAGE, e.to_string()))?
    } else {
        args.games.clone()
    };
    if game_ids.is_empty() {
        return Err(recon_err(
            EXIT_USAGE,
            format!("no games found under {}", args.games_dir.display()),
        )
        .with_hint("each game needs its own directory holding a metadata file"));
    }

    if args.jobs > 0 {
        // A second call in the same process fails; the first pool stays in effect.
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build_global()
        {
            debug!("thread pool already configured: {e}");
        }
    }
    info!(
        "reconciling {} game(s) from {} with config '{}'",
        game_ids.len(),
        args.games_dir.display(),
        config.name
    );

    let outcomes: Vec<GameOutcome> = game_ids
        .par_iter()
        .map(|game_id| match reconcile(&config, &source, game_id) {
            Ok(result) => GameOutcome::Reconciled(result),
            Err(e) => GameOutcome::Failed {
                game_id: game_id.clone(),
                error: e.to_string(),
            },
        })
        .collect();

    let season = SeasonSummary::fold(&outcomes);
    info!(
        "batch done: {} reconciled, {} failed, worst status {}",
        season.games_processed,
        season.games_failed,
        season.worst_status()
    );

    // Human summary to stderr
    for outcome in &outcomes {
        eprintln!("{}", game_line(outcome));
    }
    if args.detail {
        for outcome in &outcomes {
            if let GameOutcome::Reconciled(result) = outcome {
                eprint!("{}", game_detail(result));
            }
        }
    }
    for line in season_lines(&season) {
        eprintln!("{line}");
    }

    if args.json || args.output.is_some() {
        let report = BatchReport {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            config_name: config.name.clone(),
            games_dir: args.games_dir.display().to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            season: season.clone(),
            games: outcomes,
        };
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str)
                .map_err(|e| recon_err(EXIT_ERROR, format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    if season.games_failed > 0 {
        return Err(recon_err(
            EXIT_GAMES_FAILED,
            format!("{} game(s) could not be reconciled", season.games_failed),
        ));
    }
    if season.games_with_major > 0 {
        return Err(recon_err(
            EXIT_MAJOR_DISCREPANCY,
            format!("major discrepancies in {} game(s)", season.games_with_major),
        )
        .with_hint("rerun with --detail to see the affected players and teams"));
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    let sources = config
        .derived_sources()
        .map_err(|e| recon_err(EXIT_INVALID_CONFIG, e.to_string()))?;
    let names: Vec<&str> = sources.iter().map(|(s, _)| s.as_str()).collect();
    eprintln!(
        "valid: config '{}' with {} derived source(s) [{}], {} team(s), minor threshold {}",
        config.name,
        sources.len(),
        names.join(", "),
        config.teams.len(),
        config.minor_threshold,
    );
    Ok(())
}
