use std::path::PathBuf;

use scoresheet_recon::model::{
    ComparisonKind, EntityPresence, EntityRef, ReconciliationStatus, SourceId, WarningKind,
};
use scoresheet_recon::{reconcile, DirectorySource, GameReconciliationResult, ReconConfig, ReconError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn nhl_config() -> ReconConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/nhl.recon.toml");
    let toml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ReconConfig::from_toml(&toml).unwrap()
}

fn run_game(game_id: &str) -> Result<GameReconciliationResult, ReconError> {
    let config = nhl_config();
    let source = DirectorySource::new(fixtures_dir().join("games"), &config).unwrap();
    reconcile(&config, &source, game_id)
}

#[test]
fn discovers_fixture_games() {
    let config = nhl_config();
    let source = DirectorySource::new(fixtures_dir().join("games"), &config).unwrap();
    assert_eq!(
        source.game_ids().unwrap(),
        vec!["2023020204", "2023020415", "2023020999"]
    );
}

// -------------------------------------------------------------------------
// Clean overtime game
// -------------------------------------------------------------------------

#[test]
fn overtime_game_all_sources_agree() {
    let result = run_game("2023020204").unwrap();

    assert_eq!(result.home_team, "TOR");
    assert_eq!(result.away_team, "BOS");
    assert_eq!(result.date.to_string(), "2023-11-06");
    assert_eq!(result.total_goals, 5);
    assert_eq!(result.sources_compared, SourceId::DERIVED.to_vec());
    assert!(result.sources_unavailable.is_empty());

    assert_eq!(result.teams.len(), 2);
    assert_eq!(result.players.len(), 7);
    assert!(result.is_perfect(), "warnings: {:#?}", result.warnings);
    assert_eq!(result.reconciliation_percentage, 100.0);
    assert!(result.critical_discrepancies.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn overtime_goal_split_by_phase() {
    let result = run_game("2023020204").unwrap();
    let matthews = result.player(8479318).unwrap();
    assert_eq!(matthews.name, "Auston Matthews");

    let game_summary = matthews.source(SourceId::DerivedA).unwrap();
    let rt = game_summary.comparison(ComparisonKind::RegularTime).unwrap();
    let ot = game_summary.comparison(ComparisonKind::Overtime).unwrap();
    assert_eq!(rt.authoritative.goals, 1);
    assert_eq!(rt.authoritative.assists, 1);
    assert_eq!(ot.authoritative.goals, 1);

    // The event summary files the overtime goal under the third period; the
    // combined comparison still agrees.
    let event_summary = matthews.source(SourceId::DerivedB).unwrap();
    assert_eq!(event_summary.comparisons().len(), 1);
    let combined = event_summary.comparisons()[0];
    assert_eq!(combined.kind, ComparisonKind::CombinedRegularAndOvertime);
    assert_eq!(combined.authoritative.goals, 2);
    assert_eq!(combined.derived.goals, 2);
}

// -------------------------------------------------------------------------
// Shootout game with disagreeing feeds
// -------------------------------------------------------------------------

#[test]
fn shootout_game_summary() {
    let result = run_game("2023020415").unwrap();

    assert_eq!(result.total_goals, 7);
    assert_eq!(
        result.sources_compared,
        vec![SourceId::DerivedA, SourceId::DerivedC]
    );
    assert_eq!(result.sources_unavailable, vec![SourceId::DerivedB]);

    let players = result.player_counts();
    assert_eq!(players.perfect, 3);
    assert_eq!(players.minor, 4);
    assert_eq!(players.major, 0);

    let teams = result.team_counts();
    assert_eq!(teams.perfect, 1);
    assert_eq!(teams.major, 1);

    assert!((result.reconciliation_percentage - 400.0 / 9.0).abs() < 1e-9);
}

#[test]
fn shootout_outcome_missed_by_play_by_play() {
    let result = run_game("2023020415").unwrap();
    let mtl = result.team("MTL").unwrap();
    assert_eq!(mtl.status(), ReconciliationStatus::MajorDiscrepancy);

    let game_summary = mtl.source(SourceId::DerivedA).unwrap();
    assert_eq!(game_summary.status(), ReconciliationStatus::Perfect);
    let outcome = game_summary.comparison(ComparisonKind::ShootoutOutcome).unwrap();
    assert_eq!((outcome.authoritative.goals, outcome.derived.goals), (1, 1));

    let pbp = mtl.source(SourceId::DerivedC).unwrap();
    let outcome = pbp.comparison(ComparisonKind::ShootoutOutcome).unwrap();
    assert_eq!((outcome.authoritative.goals, outcome.derived.goals), (1, 0));
    assert_eq!(pbp.comparison(ComparisonKind::Shootout).unwrap().goal_delta(), 1);
    assert_eq!(pbp.comparison(ComparisonKind::RegularTime).unwrap().goal_delta(), 1);
    assert_eq!(pbp.total_abs_delta(), 3);

    let tor = result.team("TOR").unwrap();
    assert_eq!(tor.status(), ReconciliationStatus::Perfect);

    assert_eq!(result.critical_discrepancies.len(), 1);
    let critical = &result.critical_discrepancies[0];
    assert_eq!(critical.entity, EntityRef::Team { team: "MTL".into() });
    assert_eq!(critical.deltas.len(), 3);
    assert!(critical.message.starts_with("team MTL: derived_c"), "{}", critical.message);
}

#[test]
fn misattributed_goal_charges_both_players() {
    let result = run_game("2023020415").unwrap();

    let marner = result.player(8478483).unwrap();
    let cmp = marner
        .source(SourceId::DerivedA)
        .unwrap()
        .comparison(ComparisonKind::RegularTime)
        .copied()
        .unwrap();
    assert_eq!(cmp.goal_delta(), -1);
    assert_eq!(cmp.assist_delta(), Some(1));
    assert_eq!(marner.status(), ReconciliationStatus::MinorDiscrepancy);

    let nylander = result.player(8477939).unwrap();
    let sc = nylander.source(SourceId::DerivedA).unwrap();
    assert_eq!(sc.presence, EntityPresence::AuthoritativeOnly);
    assert_eq!(nylander.status(), ReconciliationStatus::MinorDiscrepancy);
    assert_eq!(
        nylander.source(SourceId::DerivedC).unwrap().status(),
        ReconciliationStatus::Perfect
    );
}

#[test]
fn shootout_only_player_skips_sources_that_ignore_shootouts() {
    let result = run_game("2023020415").unwrap();
    let slafkovsky = result.player(8483515).unwrap();
    assert!(slafkovsky.source(SourceId::DerivedA).is_none());
    let pbp = slafkovsky.source(SourceId::DerivedC).unwrap();
    assert_eq!(pbp.comparisons().len(), 3);
    assert_eq!(slafkovsky.status(), ReconciliationStatus::Perfect);
}

#[test]
fn anomalies_and_missing_source_are_warned() {
    let result = run_game("2023020415").unwrap();
    let count = |kind| result.warnings.iter().filter(|w| w.kind == kind).count();

    assert_eq!(count(WarningKind::MinorDiscrepancy), 4);
    assert_eq!(count(WarningKind::ShootoutAssistDropped), 1);
    assert_eq!(count(WarningKind::UnknownTeam), 1);
    assert_eq!(count(WarningKind::SourceUnavailable), 1);
    assert_eq!(result.warnings.len(), 7);

    let dropped = result
        .warnings
        .iter()
        .find(|w| w.kind == WarningKind::ShootoutAssistDropped)
        .unwrap();
    assert_eq!(dropped.source, Some(SourceId::DerivedA));
}

#[test]
fn result_serializes_to_json() {
    let result = run_game("2023020415").unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["game_id"], "2023020415");
    assert_eq!(json["sources_unavailable"][0], "derived_b");
    assert_eq!(json["teams"][0]["team"], "MTL");
    assert_eq!(json["teams"][0]["status"], "major_discrepancy");
    assert_eq!(json["critical_discrepancies"][0]["entity"]["entity"], "team");
}

// -------------------------------------------------------------------------
// Missing authoritative feed
// -------------------------------------------------------------------------

#[test]
fn missing_authoritative_feed_fails_game() {
    let err = run_game("2023020999").unwrap_err();
    assert_eq!(
        err,
        ReconError::MissingAuthoritativeSource {
            game_id: "2023020999".into()
        }
    );
    assert!(err.is_fatal_for_game());
}

#[test]
fn unknown_game_has_no_metadata() {
    let err = run_game("1999999999").unwrap_err();
    assert!(matches!(err, ReconError::MissingGameMetadata { .. }));
}

#[test]
fn dropping_a_source_leaves_the_others_untouched() {
    let full = run_game("2023020415").unwrap();

    let mut config = nhl_config();
    config.sources.remove("derived_c");
    let source = DirectorySource::new(fixtures_dir().join("games"), &config).unwrap();
    let partial = reconcile(&config, &source, "2023020415").unwrap();

    assert_eq!(partial.sources_compared, vec![SourceId::DerivedA]);
    for player in &partial.players {
        let before = full.players.iter().find(|p| p.key == player.key).unwrap();
        assert_eq!(
            player.source(SourceId::DerivedA),
            before.source(SourceId::DerivedA)
        );
    }
    assert_eq!(
        partial.team("MTL").unwrap().status(),
        ReconciliationStatus::Perfect
    );
}
