//! Authoritative-vs-derived comparison and severity classification.
//!
//! Every derived source is compared independently against the authoritative
//! tallies; an entity's overall status is the worst of its per-source
//! statuses, so adding or dropping one source never disturbs another's
//! comparisons.

use std::collections::BTreeSet;

use crate::aggregate::{EntityTallies, SourceTallies};
use crate::config::{PhaseResolution, SourceProfile};
use crate::model::{
    ComparisonKind, EntityPhaseComparison, EntityPresence, GameMetadata, PhaseTally, PlayerKey,
    SourceComparison, SourceId,
};

/// A derived source ready for comparison.
#[derive(Debug, Clone, Copy)]
pub struct DerivedInput<'a> {
    pub tallies: &'a SourceTallies,
    pub profile: &'a SourceProfile,
}

impl DerivedInput<'_> {
    pub fn source(&self) -> SourceId {
        self.tallies.source
    }
}

/// Per-phase comparisons of one entity, restricted to what the derived
/// source's profile reports. `with_assists` is false for teams.
pub fn phase_comparisons(
    authoritative: &EntityTallies,
    derived: &EntityTallies,
    profile: &SourceProfile,
    with_assists: bool,
) -> Vec<EntityPhaseComparison> {
    let assists_compared = with_assists && profile.assists;
    let compare = |kind, authoritative, derived| EntityPhaseComparison {
        kind,
        authoritative,
        derived,
        assists_compared,
    };

    let mut out = Vec::with_capacity(3);
    match profile.phases {
        PhaseResolution::Exact => {
            out.push(compare(
                ComparisonKind::RegularTime,
                authoritative.regular_time,
                derived.regular_time,
            ));
            out.push(compare(
                ComparisonKind::Overtime,
                authoritative.overtime,
                derived.overtime,
            ));
        }
        PhaseResolution::Combined => out.push(compare(
            ComparisonKind::CombinedRegularAndOvertime,
            authoritative.combined_regular_and_overtime(),
            derived.combined_regular_and_overtime(),
        )),
    }
    if profile.shootout_goals {
        out.push(EntityPhaseComparison {
            kind: ComparisonKind::Shootout,
            authoritative: PhaseTally::new(authoritative.shootout.goals, 0),
            derived: PhaseTally::new(derived.shootout.goals, 0),
            assists_compared: false,
        });
    }
    out
}

/// 1 if `team` won the shootout according to one source, else 0.
///
/// With a final score the winner is the team whose final exceeds its
/// regular+overtime goals; without one, the team with strictly more
/// shootout goals.
pub fn shootout_outcome(
    own: &EntityTallies,
    opponent: &EntityTallies,
    final_score: Option<u32>,
) -> u32 {
    match final_score {
        Some(final_goals) => u32::from(final_goals > own.statistical_goals()),
        None => u32::from(own.shootout.goals > opponent.shootout.goals),
    }
}

/// Whether the authoritative side shows the game was decided in a shootout:
/// a shootout goal was recorded, or a team's final score exceeds its
/// regular+overtime goals.
pub fn went_to_shootout(metadata: &GameMetadata, authoritative: &SourceTallies) -> bool {
    if authoritative.teams.values().any(|t| t.shootout.goals > 0) {
        return true;
    }
    let final_score = metadata.final_score();
    [&metadata.home_team, &metadata.away_team].into_iter().any(|team| {
        let statistical = authoritative.team(team).map_or(0, EntityTallies::statistical_goals);
        metadata
            .score_for(&final_score, team)
            .is_some_and(|goals| goals > statistical)
    })
}

fn shootout_outcome_comparison(authoritative: u32, derived: u32) -> EntityPhaseComparison {
    EntityPhaseComparison {
        kind: ComparisonKind::ShootoutOutcome,
        authoritative: PhaseTally::new(authoritative, 0),
        derived: PhaseTally::new(derived, 0),
        assists_compared: false,
    }
}

fn presence(in_authoritative: bool, in_derived: bool) -> EntityPresence {
    match (in_authoritative, in_derived) {
        (true, false) => EntityPresence::AuthoritativeOnly,
        (false, true) => EntityPresence::DerivedOnly,
        _ => EntityPresence::Both,
    }
}

/// Compare one player against one derived source. `None` when neither side
/// has anything the source's profile compares.
pub fn compare_player(
    key: &PlayerKey,
    authoritative: &SourceTallies,
    derived: DerivedInput<'_>,
    minor_threshold: u32,
) -> Option<SourceComparison> {
    let auth = authoritative.player(key);
    let der = derived.tallies.player(key);
    let empty = EntityTallies::default();

    let comparisons = phase_comparisons(
        auth.unwrap_or(&empty),
        der.unwrap_or(&empty),
        derived.profile,
        true,
    );
    if comparisons
        .iter()
        .all(|c| c.authoritative.is_empty() && c.derived.is_empty())
    {
        return None;
    }

    Some(SourceComparison::new(
        derived.source(),
        presence(auth.is_some(), der.is_some()),
        comparisons,
        minor_threshold,
    ))
}

/// Compare one team against one derived source. Teams are compared on goals,
/// plus the shootout outcome when the profile asks for it and the game went
/// to a shootout.
pub fn compare_team(
    team: &str,
    metadata: &GameMetadata,
    authoritative: &SourceTallies,
    derived: DerivedInput<'_>,
    minor_threshold: u32,
) -> SourceComparison {
    let empty = EntityTallies::default();
    let auth = authoritative.team(team);
    let der = derived.tallies.team(team);

    let mut comparisons = phase_comparisons(
        auth.unwrap_or(&empty),
        der.unwrap_or(&empty),
        derived.profile,
        false,
    );

    if derived.profile.shootout_outcome && went_to_shootout(metadata, authoritative) {
        if let Some(opponent) = metadata.opponent(team) {
            let auth_outcome = shootout_outcome(
                auth.unwrap_or(&empty),
                authoritative.team(opponent).unwrap_or(&empty),
                metadata.score_for(&metadata.final_score(), team),
            );
            let derived_final = derived
                .tallies
                .final_score
                .as_ref()
                .and_then(|score| metadata.score_for(score, team));
            let derived_outcome = shootout_outcome(
                der.unwrap_or(&empty),
                derived.tallies.team(opponent).unwrap_or(&empty),
                derived_final,
            );
            comparisons.push(shootout_outcome_comparison(auth_outcome, derived_outcome));
        }
    }

    let presence = if metadata.opponent(team).is_some() {
        EntityPresence::Both
    } else {
        presence(auth.is_some(), der.is_some())
    };
    SourceComparison::new(derived.source(), presence, comparisons, minor_threshold)
}

/// Every player any source credits, in key order.
pub fn player_universe(authoritative: &SourceTallies, derived: &[DerivedInput<'_>]) -> BTreeSet<PlayerKey> {
    let mut keys: BTreeSet<PlayerKey> = authoritative.players.keys().cloned().collect();
    for d in derived {
        keys.extend(d.tallies.players.keys().cloned());
    }
    keys
}

/// Home and away, then any other team a feed mentions.
pub fn team_universe(
    metadata: &GameMetadata,
    authoritative: &SourceTallies,
    derived: &[DerivedInput<'_>],
) -> Vec<String> {
    let mut teams = vec![metadata.home_team.clone(), metadata.away_team.clone()];
    let mut extra: BTreeSet<String> = authoritative.teams.keys().cloned().collect();
    for d in derived {
        extra.extend(d.tallies.teams.keys().cloned());
    }
    for team in extra {
        if !teams.contains(&team) {
            teams.push(team);
        }
    }
    teams
}
