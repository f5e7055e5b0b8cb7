use std::fmt::Write as _;

use crate::aggregate::SourceTallies;
use crate::discrepancy::{
    compare_player, compare_team, player_universe, team_universe, DerivedInput,
};
use crate::error::ReconError;
use crate::model::{
    CriticalDiscrepancy, DeltaDetail, EntityPresence, EntityRef, GameMetadata,
    GameReconciliationResult, PlayerReconciliationResult, Quantity, ReconciliationStatus,
    SourceComparison, SourceId, TeamReconciliationResult, Warning, WarningKind,
};
use crate::normalize::Anomaly;

/// Inputs of the final assembly step for one game.
pub struct GameParts<'a> {
    pub metadata: &'a GameMetadata,
    pub authoritative: &'a SourceTallies,
    pub derived: &'a [DerivedInput<'a>],
    pub unavailable: &'a [(SourceId, String)],
    pub roster_error: Option<&'a ReconError>,
    pub anomalies: &'a [Anomaly],
    pub minor_threshold: u32,
}

pub fn build_team_results(parts: &GameParts<'_>) -> Vec<TeamReconciliationResult> {
    team_universe(parts.metadata, parts.authoritative, parts.derived)
        .into_iter()
        .map(|team| {
            let sources: Vec<SourceComparison> = parts
                .derived
                .iter()
                .map(|d| {
                    compare_team(
                        &team,
                        parts.metadata,
                        parts.authoritative,
                        *d,
                        parts.minor_threshold,
                    )
                })
                .collect();
            TeamReconciliationResult { team, sources }
        })
        .collect()
}

pub fn build_player_results(parts: &GameParts<'_>) -> Vec<PlayerReconciliationResult> {
    player_universe(parts.authoritative, parts.derived)
        .into_iter()
        .map(|key| {
            let label = std::iter::once(parts.authoritative)
                .chain(parts.derived.iter().map(|d| d.tallies))
                .find_map(|t| t.labels.get(&key))
                .cloned();
            let sources: Vec<SourceComparison> = parts
                .derived
                .iter()
                .filter_map(|d| compare_player(&key, parts.authoritative, *d, parts.minor_threshold))
                .collect();
            let (name, sweater_number, team) = match label {
                Some(l) => (l.name, l.sweater_number, l.team),
                None => (key.to_string(), None, String::new()),
            };
            PlayerReconciliationResult {
                key,
                name,
                sweater_number,
                team,
                sources,
            }
        })
        .collect()
}

/// Every nonzero delta across an entity's sources.
pub fn delta_details(sources: &[SourceComparison]) -> Vec<DeltaDetail> {
    let mut out = Vec::new();
    for sc in sources {
        for c in sc.comparisons() {
            let goal_delta = c.goal_delta();
            if goal_delta != 0 {
                out.push(DeltaDetail {
                    source: sc.source,
                    kind: c.kind,
                    quantity: Quantity::Goals,
                    delta: goal_delta,
                });
            }
            if let Some(assist_delta) = c.assist_delta().filter(|d| *d != 0) {
                out.push(DeltaDetail {
                    source: sc.source,
                    kind: c.kind,
                    quantity: Quantity::Assists,
                    delta: assist_delta,
                });
            }
        }
    }
    out
}

/// `"Auston Matthews #34 (TOR): derived_a regular_time goals +1; derived_b absent from feed"`
pub fn discrepancy_message(entity: &EntityRef, sources: &[SourceComparison]) -> String {
    let mut parts = Vec::new();
    for sc in sources.iter().filter(|s| s.status() != ReconciliationStatus::Perfect) {
        let mut part = sc.source.to_string();
        match sc.presence {
            EntityPresence::AuthoritativeOnly => part.push_str(" absent from feed"),
            EntityPresence::DerivedOnly => part.push_str(" not in authoritative feed"),
            EntityPresence::Both => {}
        }
        let deltas: Vec<String> = delta_details(std::slice::from_ref(sc))
            .into_iter()
            .map(|d| format!("{} {} {:+}", d.kind, d.quantity, d.delta))
            .collect();
        if !deltas.is_empty() {
            let _ = write!(part, " {}", deltas.join(", "));
        }
        parts.push(part);
    }
    format!("{entity}: {}", parts.join("; "))
}

fn warning_kind(error: &ReconError) -> WarningKind {
    match error {
        ReconError::IdentityNotFound { .. } => WarningKind::IdentityNotFound,
        ReconError::AmbiguousIdentity { .. } => WarningKind::AmbiguousIdentity,
        ReconError::InvariantViolation(_) => WarningKind::ShootoutAssistDropped,
        ReconError::UnknownTeam(_) => WarningKind::UnknownTeam,
        ReconError::SourceUnavailable { .. } => WarningKind::SourceUnavailable,
        _ => WarningKind::InvalidRecord,
    }
}

pub fn anomaly_warning(anomaly: &Anomaly) -> Warning {
    Warning {
        kind: warning_kind(&anomaly.error),
        entity: None,
        source: Some(anomaly.source),
        deltas: Vec::new(),
        message: format!(
            "{} P{} {}: {}",
            anomaly.source, anomaly.period, anomaly.time_in_period, anomaly.error
        ),
    }
}

/// Share of entities with `Perfect` status, 0-100. An empty game is 100.
pub fn reconciliation_percentage(statuses: impl IntoIterator<Item = ReconciliationStatus>) -> f64 {
    let (perfect, total) = statuses.into_iter().fold((0usize, 0usize), |(p, t), s| {
        (p + usize::from(s == ReconciliationStatus::Perfect), t + 1)
    });
    if total == 0 {
        100.0
    } else {
        perfect as f64 * 100.0 / total as f64
    }
}

pub fn build_game_result(parts: &GameParts<'_>) -> GameReconciliationResult {
    let teams = build_team_results(parts);
    let players = build_player_results(parts);

    let mut critical_discrepancies = Vec::new();
    let mut warnings = Vec::new();

    let entities = teams
        .iter()
        .map(|t| (t.entity(), t.sources.as_slice(), t.status()))
        .chain(players.iter().map(|p| (p.entity(), p.sources.as_slice(), p.status())));
    for (entity, sources, status) in entities {
        match status {
            ReconciliationStatus::Perfect => {}
            ReconciliationStatus::MinorDiscrepancy => warnings.push(Warning {
                kind: WarningKind::MinorDiscrepancy,
                message: discrepancy_message(&entity, sources),
                deltas: delta_details(sources),
                entity: Some(entity),
                source: None,
            }),
            ReconciliationStatus::MajorDiscrepancy => {
                critical_discrepancies.push(CriticalDiscrepancy {
                    message: discrepancy_message(&entity, sources),
                    deltas: delta_details(sources),
                    entity,
                })
            }
        }
    }

    if let Some(error) = parts.roster_error {
        warnings.push(Warning {
            kind: WarningKind::RosterUnavailable,
            entity: None,
            source: None,
            deltas: Vec::new(),
            message: format!("roster unavailable, sweater numbers unresolved: {error}"),
        });
    }
    warnings.extend(parts.anomalies.iter().map(anomaly_warning));
    warnings.extend(parts.unavailable.iter().map(|(source, reason)| {
        let error = ReconError::SourceUnavailable {
            source: *source,
            reason: reason.clone(),
        };
        Warning {
            kind: WarningKind::SourceUnavailable,
            entity: None,
            source: Some(*source),
            deltas: Vec::new(),
            message: error.to_string(),
        }
    }));

    let reconciliation_percentage = reconciliation_percentage(
        teams
            .iter()
            .map(|t| t.status())
            .chain(players.iter().map(|p| p.status())),
    );

    let metadata = parts.metadata;
    GameReconciliationResult {
        game_id: metadata.game_id.clone(),
        date: metadata.date,
        home_team: metadata.home_team.clone(),
        away_team: metadata.away_team.clone(),
        total_goals: parts.authoritative.event_count,
        sources_compared: parts.derived.iter().map(|d| d.source()).collect(),
        sources_unavailable: parts.unavailable.iter().map(|(s, _)| *s).collect(),
        teams,
        players,
        critical_discrepancies,
        warnings,
        reconciliation_percentage,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComparisonKind, EntityPhaseComparison, PhaseTally, PlayerKey};

    fn comparison(kind: ComparisonKind, auth: (u32, u32), derived: (u32, u32)) -> EntityPhaseComparison {
        EntityPhaseComparison {
            kind,
            authoritative: PhaseTally::new(auth.0, auth.1),
            derived: PhaseTally::new(derived.0, derived.1),
            assists_compared: true,
        }
    }

    fn player_entity() -> EntityRef {
        EntityRef::Player {
            key: PlayerKey::Resolved { player_id: 8479318 },
            name: "Auston Matthews".into(),
            sweater_number: Some(34),
            team: "TOR".into(),
        }
    }

    #[test]
    fn percentage_bounds() {
        use ReconciliationStatus::*;
        assert_eq!(reconciliation_percentage(Vec::new()), 100.0);
        assert_eq!(reconciliation_percentage([Perfect, Perfect]), 100.0);
        assert_eq!(reconciliation_percentage([Perfect, MajorDiscrepancy]), 50.0);
        assert_eq!(reconciliation_percentage([MinorDiscrepancy]), 0.0);
    }

    #[test]
    fn delta_details_skip_zero() {
        let sources = vec![SourceComparison::new(
            SourceId::DerivedA,
            EntityPresence::Both,
            vec![
                comparison(ComparisonKind::RegularTime, (2, 1), (1, 1)),
                comparison(ComparisonKind::Overtime, (0, 0), (0, 1)),
            ],
            2,
        )];
        let details = delta_details(&sources);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].quantity, Quantity::Goals);
        assert_eq!(details[0].delta, 1);
        assert_eq!(details[1].kind, ComparisonKind::Overtime);
        assert_eq!(details[1].quantity, Quantity::Assists);
        assert_eq!(details[1].delta, -1);
    }

    #[test]
    fn message_names_source_and_signed_delta() {
        let sources = vec![
            SourceComparison::new(
                SourceId::DerivedA,
                EntityPresence::Both,
                vec![comparison(ComparisonKind::RegularTime, (2, 0), (1, 0))],
                2,
            ),
            SourceComparison::new(
                SourceId::DerivedB,
                EntityPresence::Both,
                vec![comparison(ComparisonKind::CombinedRegularAndOvertime, (2, 0), (2, 0))],
                2,
            ),
        ];
        let msg = discrepancy_message(&player_entity(), &sources);
        assert_eq!(msg, "Auston Matthews #34 (TOR): derived_a regular_time goals +1");
    }

    #[test]
    fn message_flags_absent_entity() {
        let sources = vec![SourceComparison::new(
            SourceId::DerivedC,
            EntityPresence::AuthoritativeOnly,
            vec![comparison(ComparisonKind::RegularTime, (3, 0), (0, 0))],
            2,
        )];
        let msg = discrepancy_message(&player_entity(), &sources);
        assert!(msg.contains("derived_c absent from feed regular_time goals +3"), "{msg}");
    }

    #[test]
    fn roster_error_becomes_one_warning() {
        let authoritative = SourceTallies {
            source: SourceId::Authoritative,
            players: Default::default(),
            teams: Default::default(),
            labels: Default::default(),
            final_score: None,
            event_count: 0,
        };
        let metadata = GameMetadata {
            game_id: "2023020001".into(),
            date: chrono::NaiveDate::from_ymd_opt(2023, 10, 10).unwrap(),
            home_team: "TOR".into(),
            away_team: "MTL".into(),
            home_score: 0,
            away_score: 0,
        };
        let error = ReconError::RosterParse {
            line: 3,
            message: "invalid digit found in string".into(),
        };
        let result = build_game_result(&GameParts {
            metadata: &metadata,
            authoritative: &authoritative,
            derived: &[],
            unavailable: &[],
            roster_error: Some(&error),
            anomalies: &[],
            minor_threshold: 2,
        });
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::RosterUnavailable);
        assert!(result.warnings[0].message.contains("roster line 3"));
        assert!(result.critical_discrepancies.is_empty());
    }

    #[test]
    fn anomaly_kinds() {
        let anomaly = Anomaly {
            source: SourceId::DerivedB,
            period: 5,
            time_in_period: "00:00".into(),
            error: ReconError::InvariantViolation("shootout goal carried assists".into()),
        };
        let w = anomaly_warning(&anomaly);
        assert_eq!(w.kind, WarningKind::ShootoutAssistDropped);
        assert_eq!(w.source, Some(SourceId::DerivedB));
        assert!(w.message.starts_with("derived_b P5 00:00"));
    }
}
