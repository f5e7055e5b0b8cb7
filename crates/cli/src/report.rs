//! Per-game outcomes and the text/JSON shapes they are reported in.

use std::fmt::Write as _;

use serde::Serialize;

use scoresheet_recon::model::{ReconciliationStatus, SourceComparison};
use scoresheet_recon::GameReconciliationResult;

use crate::season::SeasonSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameOutcome {
    Reconciled(GameReconciliationResult),
    Failed { game_id: String, error: String },
}

/// Everything a `reconcile --json` run emits.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub tool_version: String,
    pub config_name: String,
    pub games_dir: String,
    pub run_at: String,
    pub season: SeasonSummary,
    pub games: Vec<GameOutcome>,
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

pub fn game_line(outcome: &GameOutcome) -> String {
    match outcome {
        GameOutcome::Reconciled(r) => {
            let players = r.player_counts();
            let teams = r.team_counts();
            format!(
                "{}  {} {}@{}  {:5.1}%  players {}/{}/{}  teams {}/{}/{}  critical {}  warnings {}",
                r.game_id,
                r.date,
                r.away_team,
                r.home_team,
                r.reconciliation_percentage,
                players.perfect,
                players.minor,
                players.major,
                teams.perfect,
                teams.minor,
                teams.major,
                r.critical_discrepancies.len(),
                r.warnings.len(),
            )
        }
        GameOutcome::Failed { game_id, error } => format!("{game_id}  FAILED  {error}"),
    }
}

pub fn season_lines(season: &SeasonSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "season: {} games reconciled, {} failed, {} perfect",
        season.games_processed, season.games_failed, season.perfect_games
    )];
    lines.push(format!(
        "players: {} perfect, {} minor, {} major",
        season.players.perfect, season.players.minor, season.players.major
    ));
    lines.push(format!(
        "teams: {} perfect, {} minor, {} major",
        season.teams.perfect, season.teams.minor, season.teams.major
    ));
    lines.push(format!(
        "{} critical discrepancies, {} warnings, mean reconciliation {:.1}%",
        season.critical_discrepancies, season.warnings, season.mean_reconciliation_percentage
    ));
    for (source, usage) in &season.sources {
        lines.push(format!(
            "  {source}: compared in {} games, unavailable in {}",
            usage.compared, usage.unavailable
        ));
    }
    lines
}

fn status_mark(status: ReconciliationStatus) -> &'static str {
    match status {
        ReconciliationStatus::Perfect => "ok",
        ReconciliationStatus::MinorDiscrepancy => "minor",
        ReconciliationStatus::MajorDiscrepancy => "MAJOR",
    }
}

fn source_cells(sources: &[SourceComparison]) -> String {
    sources
        .iter()
        .map(|s| format!("{}={}", s.source, status_mark(s.status())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line report for one game: every non-perfect entity, then every
/// critical discrepancy and warning.
pub fn game_detail(result: &GameReconciliationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {} {} {} @ {} ({:.1}% reconciled, engine {})",
        result.game_id,
        result.date,
        result.away_team,
        result.home_team,
        result.reconciliation_percentage,
        result.engine_version
    );

    let compared: Vec<String> = result.sources_compared.iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "sources: {}", compared.join(", "));
    if !result.sources_unavailable.is_empty() {
        let missing: Vec<String> = result
            .sources_unavailable
            .iter()
            .map(|s| s.to_string())
            .collect();
        let _ = writeln!(out, "unavailable: {}", missing.join(", "));
    }

    for team in result.teams.iter().filter(|t| t.status() != ReconciliationStatus::Perfect) {
        let _ = writeln!(
            out,
            "  team   {:<28} {:<6} {}",
            team.team,
            status_mark(team.status()),
            source_cells(&team.sources)
        );
    }
    for player in result.players.iter().filter(|p| p.status() != ReconciliationStatus::Perfect) {
        let label = match player.sweater_number {
            Some(n) => format!("{} #{n} {}", player.team, player.name),
            None => format!("{} {}", player.team, player.name),
        };
        let _ = writeln!(
            out,
            "  player {:<28} {:<6} {}",
            label,
            status_mark(player.status()),
            source_cells(&player.sources)
        );
    }

    for critical in &result.critical_discrepancies {
        let _ = writeln!(out, "  critical: {}", critical.message);
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "  warning: {}", warning.message);
    }
    out
}
