use log::warn;
use serde::Serialize;

use crate::error::ReconError;
use crate::identity::{RosterIndex, TeamDirectory};
use crate::model::{
    EventHeader, Phase, PlayerRef, RawGoalRecord, RawPlayerMention, ScoringEvent, SourceId,
};

/// Phase of a goal, from the only two signals any feed carries.
pub fn classify_phase(explicit_shootout: bool, period: u32) -> Phase {
    if explicit_shootout || period >= 5 {
        Phase::Shootout
    } else if period == 4 {
        Phase::Overtime
    } else {
        Phase::RegularTime
    }
}

/// Shared lookups for normalizing one feed of one game.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub game_id: &'a str,
    pub source: SourceId,
    pub roster: &'a RosterIndex,
    pub teams: &'a TeamDirectory,
}

/// A recovered per-record problem. The pipeline continued past it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub source: SourceId,
    pub period: u32,
    pub time_in_period: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: ReconError,
}

fn serialize_error<S: serde::Serializer>(err: &ReconError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

#[derive(Debug, Clone)]
pub struct NormalizedFeed {
    pub source: SourceId,
    pub events: Vec<ScoringEvent>,
    pub anomalies: Vec<Anomaly>,
}

pub fn normalize_feed(ctx: NormalizeContext<'_>, records: &[RawGoalRecord]) -> NormalizedFeed {
    let mut events = Vec::with_capacity(records.len());
    let mut anomalies = Vec::new();
    for record in records {
        if let Some(event) = normalize_record(ctx, record, &mut anomalies) {
            events.push(event);
        }
    }
    NormalizedFeed {
        source: ctx.source,
        events,
        anomalies,
    }
}

/// Turn one raw record into an event. Returns `None` only when the record
/// cannot be attributed to a team or a period; every problem is pushed onto
/// `anomalies`.
pub fn normalize_record(
    ctx: NormalizeContext<'_>,
    record: &RawGoalRecord,
    anomalies: &mut Vec<Anomaly>,
) -> Option<ScoringEvent> {
    let mut note = |error: ReconError| {
        warn!(
            "game {} [{}] P{} {}: {error}",
            ctx.game_id, ctx.source, record.period, record.time_in_period
        );
        anomalies.push(Anomaly {
            source: ctx.source,
            period: record.period,
            time_in_period: record.time_in_period.clone(),
            error,
        });
    };

    if record.period == 0 {
        note(ReconError::InvalidRecord("period must be 1 or greater".into()));
        return None;
    }

    let team = match ctx.teams.resolve(&record.team) {
        Ok(team) => team,
        Err(e) => {
            note(e);
            return None;
        }
    };

    let phase = classify_phase(record.shootout, record.period);

    let scorer = resolve_mention(ctx, &record.scorer, &team, "scorer", &mut note);
    let (assist1, assist2) = if phase == Phase::Shootout {
        // Not resolved: these are about to be discarded.
        (
            record.assist1.as_ref().map(|m| unresolved(m, &team)),
            record.assist2.as_ref().map(|m| unresolved(m, &team)),
        )
    } else {
        (
            record
                .assist1
                .as_ref()
                .map(|m| resolve_mention(ctx, m, &team, "assist1", &mut note)),
            record
                .assist2
                .as_ref()
                .map(|m| resolve_mention(ctx, m, &team, "assist2", &mut note)),
        )
    };

    let header = EventHeader {
        game_id: ctx.game_id.to_string(),
        source: ctx.source,
        period: record.period,
        phase,
        time_in_period: record.time_in_period.clone(),
        team,
    };
    let (event, dropped_assists) = ScoringEvent::new(header, scorer, assist1, assist2);
    if dropped_assists {
        note(ReconError::InvariantViolation(
            "shootout goal carried assists; assists discarded".into(),
        ));
    }
    Some(event)
}

fn unresolved(mention: &RawPlayerMention, team: &str) -> PlayerRef {
    PlayerRef {
        sweater_number: mention.sweater_number,
        team: team.to_string(),
        raw_name: mention.name.clone(),
        resolved_id: mention.player_id,
        resolved_name: None,
    }
}

fn resolve_mention(
    ctx: NormalizeContext<'_>,
    mention: &RawPlayerMention,
    event_team: &str,
    role: &str,
    note: &mut impl FnMut(ReconError),
) -> PlayerRef {
    let team = match &mention.team {
        Some(team_ref) => ctx.teams.resolve(team_ref).unwrap_or_else(|e| {
            note(e);
            event_team.to_string()
        }),
        None => event_team.to_string(),
    };

    let mut player = PlayerRef {
        sweater_number: mention.sweater_number,
        team,
        raw_name: mention.name.clone(),
        resolved_id: None,
        resolved_name: None,
    };

    match (mention.player_id, mention.sweater_number) {
        (Some(player_id), _) => {
            player.resolved_id = Some(player_id);
            if let Some(entry) = ctx.roster.by_id(player_id) {
                player.resolved_name = Some(entry.name.clone());
                player.sweater_number.get_or_insert(entry.sweater_number);
            }
        }
        (None, Some(sweater)) => match ctx.roster.resolve(&player.team, sweater) {
            Ok(identity) => {
                player.resolved_id = Some(identity.player_id);
                player.resolved_name = Some(identity.name);
            }
            Err(e) => note(e),
        },
        (None, None) => note(ReconError::InvalidRecord(format!(
            "{role} has neither player id nor sweater number"
        ))),
    }
    player
}
