//! Season-level rollup over a batch of reconciled games.

use std::collections::BTreeMap;

use serde::Serialize;

use scoresheet_recon::model::{ReconciliationStatus, StatusCounts};
use scoresheet_recon::SourceId;

use crate::report::GameOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceUsage {
    pub compared: usize,
    pub unavailable: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub games_processed: usize,
    pub games_failed: usize,
    pub perfect_games: usize,
    /// Games with at least one entity in major discrepancy.
    pub games_with_major: usize,
    pub players: StatusCounts,
    pub teams: StatusCounts,
    pub critical_discrepancies: usize,
    pub warnings: usize,
    /// Mean of the per-game percentages; 100 when nothing was reconciled.
    pub mean_reconciliation_percentage: f64,
    pub sources: BTreeMap<SourceId, SourceUsage>,
}

impl SeasonSummary {
    pub fn fold<'a>(outcomes: impl IntoIterator<Item = &'a GameOutcome>) -> Self {
        let mut summary = SeasonSummary::default();
        let mut percentage_sum = 0.0;

        for outcome in outcomes {
            let result = match outcome {
                GameOutcome::Reconciled(result) => result,
                GameOutcome::Failed { .. } => {
                    summary.games_failed += 1;
                    continue;
                }
            };

            summary.games_processed += 1;
            if result.is_perfect() {
                summary.perfect_games += 1;
            }
            let players = result.player_counts();
            let teams = result.team_counts();
            if players.major + teams.major > 0 {
                summary.games_with_major += 1;
            }
            summary.players += players;
            summary.teams += teams;
            summary.critical_discrepancies += result.critical_discrepancies.len();
            summary.warnings += result.warnings.len();
            percentage_sum += result.reconciliation_percentage;

            for source in &result.sources_compared {
                summary.sources.entry(*source).or_default().compared += 1;
            }
            for source in &result.sources_unavailable {
                summary.sources.entry(*source).or_default().unavailable += 1;
            }
        }

        summary.mean_reconciliation_percentage = if summary.games_processed == 0 {
            100.0
        } else {
            percentage_sum / summary.games_processed as f64
        };
        summary
    }

    pub fn worst_status(&self) -> ReconciliationStatus {
        if self.players.major + self.teams.major > 0 {
            ReconciliationStatus::MajorDiscrepancy
        } else if self.players.minor + self.teams.minor > 0 {
            ReconciliationStatus::MinorDiscrepancy
        } else {
            ReconciliationStatus::Perfect
        }
    }
}
