use std::fmt;

use crate::model::{PlayerId, SourceId};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad source key, bad team table, etc.).
    ConfigValidation(String),
    /// A source name that is not one of the known feeds.
    UnknownSource(String),
    /// No roster entry for (team, sweater number).
    IdentityNotFound { team: String, sweater_number: u32 },
    /// The roster lists more than one player under the same (team, sweater number).
    AmbiguousIdentity {
        team: String,
        sweater_number: u32,
        candidates: Vec<PlayerId>,
    },
    /// Numeric team id missing from the team directory.
    UnknownTeam(u32),
    /// Record contradicts a scoring-event invariant; the offending field was discarded.
    InvariantViolation(String),
    /// Record could not be turned into an event at all.
    InvalidRecord(String),
    /// The authoritative feed is absent. Fatal for the game.
    MissingAuthoritativeSource { game_id: String },
    /// Game metadata (date, teams, final score) is absent. Fatal for the game.
    MissingGameMetadata { game_id: String },
    /// A derived feed could not be loaded. The source is excluded from comparison.
    SourceUnavailable { source: SourceId, reason: String },
    /// Roster CSV row could not be parsed.
    RosterParse { line: u64, message: String },
    /// Feed document could not be parsed.
    FeedParse { path: String, message: String },
    /// IO error (file read, directory listing, etc.).
    Io(String),
}

impl ReconError {
    /// Whether this error prevents any reconciliation of the game.
    pub fn is_fatal_for_game(&self) -> bool {
        matches!(
            self,
            Self::MissingAuthoritativeSource { .. } | Self::MissingGameMetadata { .. }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(name) => write!(f, "unknown source: {name}"),
            Self::IdentityNotFound { team, sweater_number } => {
                write!(f, "no roster entry for {team} #{sweater_number}")
            }
            Self::AmbiguousIdentity { team, sweater_number, candidates } => {
                let ids: Vec<String> = candidates.iter().map(|id| id.to_string()).collect();
                write!(
                    f,
                    "roster lists {} players as {team} #{sweater_number} ({})",
                    candidates.len(),
                    ids.join(", ")
                )
            }
            Self::UnknownTeam(id) => write!(f, "team id {id} not in team directory"),
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            Self::InvalidRecord(msg) => write!(f, "invalid record: {msg}"),
            Self::MissingAuthoritativeSource { game_id } => {
                write!(f, "game {game_id}: authoritative feed not found")
            }
            Self::MissingGameMetadata { game_id } => {
                write!(f, "game {game_id}: metadata not found")
            }
            Self::SourceUnavailable { source, reason } => {
                write!(f, "source '{source}' unavailable: {reason}")
            }
            Self::RosterParse { line, message } => {
                write!(f, "roster line {line}: {message}")
            }
            Self::FeedParse { path, message } => write!(f, "cannot parse {path}: {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
