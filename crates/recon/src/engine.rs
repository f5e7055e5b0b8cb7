use log::{debug, info};

use crate::aggregate::{aggregate_source, SourceTallies};
use crate::builder::{build_game_result, GameParts};
use crate::config::{ReconConfig, SourceProfile};
use crate::discrepancy::DerivedInput;
use crate::error::ReconError;
use crate::identity::RosterIndex;
use crate::model::{GameInput, GameReconciliationResult, SourceId};
use crate::normalize::{normalize_feed, Anomaly, NormalizeContext};
use crate::source::{load_game, GameSource};

/// Reconcile one game. Fails only when the authoritative feed is absent;
/// every other problem is reported in the result's warnings.
pub fn run(config: &ReconConfig, input: &GameInput) -> Result<GameReconciliationResult, ReconError> {
    let metadata = input.metadata.clone().normalized_teams();
    let game_id = metadata.game_id.as_str();
    let records = input
        .authoritative
        .as_ref()
        .ok_or_else(|| ReconError::MissingAuthoritativeSource {
            game_id: game_id.to_string(),
        })?;

    let teams = config.team_directory()?;
    let roster = RosterIndex::build(&input.roster);
    debug!("game {game_id}: roster of {} players", roster.len());

    let context = |source| NormalizeContext {
        game_id,
        source,
        roster: &roster,
        teams: &teams,
    };

    let mut anomalies: Vec<Anomaly> = Vec::new();

    let feed = normalize_feed(context(SourceId::Authoritative), records);
    anomalies.extend(feed.anomalies.iter().cloned());
    let authoritative = aggregate_source(&feed, Some(metadata.final_score()));
    debug!(
        "game {game_id}: authoritative has {} events, {} players",
        authoritative.event_count,
        authoritative.players.len()
    );

    let mut derived: Vec<(SourceTallies, &SourceProfile)> = Vec::new();
    let mut unavailable: Vec<(SourceId, String)> = Vec::new();
    for (source, profile) in config.derived_sources()? {
        match input.derived.get(&source) {
            Some(raw) => {
                let feed = normalize_feed(context(source), &raw.records);
                anomalies.extend(feed.anomalies.iter().cloned());
                derived.push((aggregate_source(&feed, raw.final_score), profile));
            }
            None => {
                let reason = input
                    .unavailable
                    .get(&source)
                    .cloned()
                    .unwrap_or_else(|| "feed not supplied".to_string());
                debug!("game {game_id}: {source} excluded: {reason}");
                unavailable.push((source, reason));
            }
        }
    }
    for source in input.derived.keys() {
        if config.profile(*source).is_none() {
            debug!("game {game_id}: {source} supplied but not configured, ignored");
        }
    }

    let derived_inputs: Vec<DerivedInput<'_>> = derived
        .iter()
        .map(|(tallies, profile)| DerivedInput { tallies, profile })
        .collect();

    let result = build_game_result(&GameParts {
        metadata: &metadata,
        authoritative: &authoritative,
        derived: &derived_inputs,
        unavailable: &unavailable,
        roster_error: input.roster_error.as_ref(),
        anomalies: &anomalies,
        minor_threshold: config.minor_threshold,
    });

    info!(
        "game {game_id}: {:.1}% reconciled, {} critical, {} warnings",
        result.reconciliation_percentage,
        result.critical_discrepancies.len(),
        result.warnings.len()
    );
    Ok(result)
}

/// Load a game through `source` and reconcile it.
pub fn reconcile<S: GameSource + ?Sized>(
    config: &ReconConfig,
    source: &S,
    game_id: &str,
) -> Result<GameReconciliationResult, ReconError> {
    let input = load_game(source, config, game_id)?;
    run(config, &input)
}
