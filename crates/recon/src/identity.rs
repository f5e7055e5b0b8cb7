//! Roster-backed identity resolution.
//!
//! Matching is exact on (team, sweater number). Free-text names are carried
//! for display only and never used to find a player.

use std::collections::{BTreeMap, HashMap};

use crate::error::ReconError;
use crate::model::{team_abbrev, PlayerId, RosterEntry, TeamRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub player_id: PlayerId,
    pub name: String,
    pub sweater_number: u32,
    pub team: String,
}

impl From<&RosterEntry> for ResolvedIdentity {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            player_id: entry.player_id,
            name: entry.name.clone(),
            sweater_number: entry.sweater_number,
            team: entry.team.clone(),
        }
    }
}

/// Per-game lookup built once from the roster side-table.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    entries: Vec<RosterEntry>,
    by_number: HashMap<(String, u32), Vec<usize>>,
    by_id: HashMap<PlayerId, usize>,
}

impl RosterIndex {
    /// Team abbreviations are stored in canonical form, so lookups are
    /// case-insensitive on the team.
    pub fn build(entries: &[RosterEntry]) -> Self {
        let entries: Vec<RosterEntry> = entries
            .iter()
            .map(|entry| RosterEntry {
                team: team_abbrev(&entry.team),
                ..entry.clone()
            })
            .collect();
        let mut by_number: HashMap<(String, u32), Vec<usize>> = HashMap::new();
        let mut by_id = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_number
                .entry((entry.team.clone(), entry.sweater_number))
                .or_default()
                .push(i);
            by_id.entry(entry.player_id).or_insert(i);
        }
        Self {
            entries,
            by_number,
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a (team, sweater number) mention. A roster that lists the same
    /// number twice for one team is reported, never guessed.
    pub fn resolve(&self, team: &str, sweater_number: u32) -> Result<ResolvedIdentity, ReconError> {
        let team = team_abbrev(team);
        match self.by_number.get(&(team.clone(), sweater_number)) {
            None => Err(ReconError::IdentityNotFound {
                team,
                sweater_number,
            }),
            Some(idx) if idx.len() == 1 => Ok(ResolvedIdentity::from(&self.entries[idx[0]])),
            Some(idx) => {
                let mut candidates: Vec<PlayerId> =
                    idx.iter().map(|&i| self.entries[i].player_id).collect();
                candidates.sort_unstable();
                Err(ReconError::AmbiguousIdentity {
                    team,
                    sweater_number,
                    candidates,
                })
            }
        }
    }

    pub fn by_id(&self, player_id: PlayerId) -> Option<&RosterEntry> {
        self.by_id.get(&player_id).map(|&i| &self.entries[i])
    }
}

/// Team id -> abbreviation, injected from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamDirectory {
    by_id: BTreeMap<u32, String>,
}

impl TeamDirectory {
    pub fn new(by_id: BTreeMap<u32, String>) -> Self {
        Self { by_id }
    }

    pub fn resolve(&self, team: &TeamRef) -> Result<String, ReconError> {
        match team {
            TeamRef::Abbrev(abbrev) => {
                let abbrev = team_abbrev(abbrev);
                if abbrev.is_empty() {
                    Err(ReconError::InvalidRecord("empty team abbreviation".into()))
                } else {
                    Ok(abbrev)
                }
            }
            TeamRef::Id(id) => self
                .by_id
                .get(id)
                .map(|abbrev| team_abbrev(abbrev))
                .ok_or(ReconError::UnknownTeam(*id)),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Load a roster table (`team,sweater_number,player_id,name`).
pub fn load_roster_csv(csv_data: &str) -> Result<Vec<RosterEntry>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let mut entries = Vec::new();
    for record in reader.deserialize::<RosterEntry>() {
        let mut entry = record.map_err(|e| ReconError::RosterParse {
            line: e.position().map_or(0, |p| p.line()),
            message: e.to_string(),
        })?;
        entry.team = team_abbrev(&entry.team);
        entries.push(entry);
    }
    Ok(entries)
}
