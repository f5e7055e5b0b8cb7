use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{FinalScore, Phase, PhaseTally, PlayerKey, ScoringEvent, SourceId};
use crate::normalize::NormalizedFeed;

/// Phase-bucketed tallies for one entity in one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityTallies {
    pub regular_time: PhaseTally,
    pub overtime: PhaseTally,
    pub shootout: PhaseTally,
}

impl EntityTallies {
    pub fn phase(&self, phase: Phase) -> PhaseTally {
        match phase {
            Phase::RegularTime => self.regular_time,
            Phase::Overtime => self.overtime,
            Phase::Shootout => self.shootout,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseTally {
        match phase {
            Phase::RegularTime => &mut self.regular_time,
            Phase::Overtime => &mut self.overtime,
            Phase::Shootout => &mut self.shootout,
        }
    }

    /// Regular time + overtime, for comparison against feeds that only
    /// report the combined figure.
    pub fn combined_regular_and_overtime(&self) -> PhaseTally {
        let mut total = self.regular_time;
        total += self.overtime;
        total
    }

    /// Goals that count as official statistics (shootout excluded).
    pub fn statistical_goals(&self) -> u32 {
        self.combined_regular_and_overtime().goals
    }

    pub fn is_empty(&self) -> bool {
        Phase::ALL.iter().all(|&p| self.phase(p).is_empty())
    }
}

/// Roll events up into per-entity tallies. `credits` maps one event to the
/// entities it credits and what each receives.
pub fn tally_by<K, F, I>(events: &[ScoringEvent], credits: F) -> BTreeMap<K, EntityTallies>
where
    K: Ord,
    F: Fn(&ScoringEvent) -> I,
    I: IntoIterator<Item = (K, PhaseTally)>,
{
    let mut out: BTreeMap<K, EntityTallies> = BTreeMap::new();
    for event in events {
        for (key, tally) in credits(event) {
            *out.entry(key).or_default().phase_mut(event.phase()) += tally;
        }
    }
    out
}

/// One goal to the scorer, one assist to each credited assister. Mentions
/// with no usable identity credit nobody.
pub fn player_credits(event: &ScoringEvent) -> Vec<(PlayerKey, PhaseTally)> {
    let mut credits = Vec::with_capacity(3);
    if let Some(key) = event.scorer().key() {
        credits.push((key, PhaseTally::new(1, 0)));
    }
    for assist in event.assists() {
        if let Some(key) = assist.key() {
            credits.push((key, PhaseTally::new(0, 1)));
        }
    }
    credits
}

pub fn team_credits(event: &ScoringEvent) -> [(String, PhaseTally); 1] {
    let assists = event.assists().count() as u32;
    [(event.team().to_string(), PhaseTally::new(1, assists))]
}

/// How a player is shown in reports, from the first feed that names them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLabel {
    pub name: String,
    pub sweater_number: Option<u32>,
    pub team: String,
}

/// Everything one source says about one game, in tally form.
#[derive(Debug, Clone)]
pub struct SourceTallies {
    pub source: SourceId,
    pub players: BTreeMap<PlayerKey, EntityTallies>,
    pub teams: BTreeMap<String, EntityTallies>,
    pub labels: BTreeMap<PlayerKey, PlayerLabel>,
    /// The source's own statement of the final score, if it has one.
    pub final_score: Option<FinalScore>,
    pub event_count: usize,
}

impl SourceTallies {
    pub fn player(&self, key: &PlayerKey) -> Option<&EntityTallies> {
        self.players.get(key)
    }

    pub fn team(&self, team: &str) -> Option<&EntityTallies> {
        self.teams.get(team)
    }
}

pub fn aggregate_source(feed: &NormalizedFeed, final_score: Option<FinalScore>) -> SourceTallies {
    let mut labels = BTreeMap::new();
    for event in &feed.events {
        for player in std::iter::once(event.scorer()).chain(event.assists()) {
            if let Some(key) = player.key() {
                labels.entry(key).or_insert_with(|| PlayerLabel {
                    name: player.display_name(),
                    sweater_number: player.sweater_number,
                    team: player.team.clone(),
                });
            }
        }
    }

    SourceTallies {
        source: feed.source,
        players: tally_by(&feed.events, player_credits),
        teams: tally_by(&feed.events, team_credits),
        labels,
        final_score,
        event_count: feed.events.len(),
    }
}
