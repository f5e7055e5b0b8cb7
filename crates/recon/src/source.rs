//! Where game records come from.
//!
//! The engine never reads files itself. A [`GameSource`] hands over the raw
//! records for one game and [`load_game`] assembles them into a
//! [`GameInput`]. [`DirectorySource`] is the on-disk implementation:
//!
//! ```text
//! <root>/<game_id>/metadata.json       GameMetadata
//! <root>/<game_id>/roster.csv          team,sweater_number,player_id,name
//! <root>/<game_id>/authoritative.json  [RawGoalRecord, ...]
//! <root>/<game_id>/derived_a.json      { "records": [...], "final_score": {...} }
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::config::{AuthoritativeConfig, ReconConfig};
use crate::error::ReconError;
use crate::identity::load_roster_csv;
use crate::model::{DerivedFeed, GameInput, GameMetadata, RawGoalRecord, RosterEntry, SourceId};

/// Supplier of raw records for one game. `Ok(None)` means the backing
/// document does not exist.
pub trait GameSource {
    fn metadata(&self, game_id: &str) -> Result<Option<GameMetadata>, ReconError>;

    fn authoritative_goals(&self, game_id: &str) -> Result<Option<Vec<RawGoalRecord>>, ReconError>;

    fn derived_goals(&self, game_id: &str, source: SourceId)
        -> Result<Option<DerivedFeed>, ReconError>;

    fn roster(&self, game_id: &str) -> Result<Vec<RosterEntry>, ReconError>;
}

/// Assemble one game's input. Missing metadata or a missing authoritative
/// feed fails the game. A derived feed that is missing or unreadable is
/// recorded as unavailable and the game goes on without it; an unreadable
/// roster is recorded on the input and the game goes on with no roster.
pub fn load_game<S: GameSource + ?Sized>(
    source: &S,
    config: &ReconConfig,
    game_id: &str,
) -> Result<GameInput, ReconError> {
    let metadata = source
        .metadata(game_id)?
        .ok_or_else(|| ReconError::MissingGameMetadata {
            game_id: game_id.to_string(),
        })?;
    let authoritative = source
        .authoritative_goals(game_id)?
        .ok_or_else(|| ReconError::MissingAuthoritativeSource {
            game_id: game_id.to_string(),
        })?;

    let mut input = match source.roster(game_id) {
        Ok(roster) => GameInput::new(metadata, roster),
        Err(e) => {
            warn!("game {game_id}: roster unreadable, sweater numbers stay unresolved: {e}");
            GameInput::new(metadata, Vec::new()).with_roster_error(e)
        }
    }
    .with_authoritative(authoritative);
    for (derived, _) in config.derived_sources()? {
        match source.derived_goals(game_id, derived) {
            Ok(Some(feed)) => {
                debug!("game {game_id}: {derived} has {} records", feed.records.len());
                input.derived.insert(derived, feed);
            }
            Ok(None) => {
                warn!("game {game_id}: {derived} feed not found");
                input
                    .unavailable
                    .insert(derived, "feed not found".to_string());
            }
            Err(e) => {
                warn!("game {game_id}: {derived} feed unreadable: {e}");
                input.unavailable.insert(derived, e.to_string());
            }
        }
    }
    Ok(input)
}

// ---------------------------------------------------------------------------
// Directory layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    layout: AuthoritativeConfig,
    files: BTreeMap<SourceId, String>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, config: &ReconConfig) -> Result<Self, ReconError> {
        let files = config
            .derived_sources()?
            .into_iter()
            .map(|(source, profile)| (source, profile.file.clone()))
            .collect();
        Ok(Self {
            root: root.into(),
            layout: config.authoritative.clone(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn game_dir(&self, game_id: &str) -> PathBuf {
        self.root.join(game_id)
    }

    /// Game directories under the root (those holding a metadata file), sorted.
    pub fn game_ids(&self) -> Result<Vec<String>, ReconError> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| ReconError::Io(format!("{}: {e}", self.root.display())))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ReconError::Io(e.to_string()))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(&self.layout.metadata_file).is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read_json<T: DeserializeOwned>(&self, game_id: &str, file: &str) -> Result<Option<T>, ReconError> {
        let path = self.game_dir(game_id).join(file);
        match read_optional(&path)? {
            Some(text) => parse_json(&path, &text).map(Some),
            None => Ok(None),
        }
    }
}

impl GameSource for DirectorySource {
    fn metadata(&self, game_id: &str) -> Result<Option<GameMetadata>, ReconError> {
        let metadata: Option<GameMetadata> = self.read_json(game_id, &self.layout.metadata_file)?;
        Ok(metadata.map(|mut m| {
            if m.game_id.is_empty() {
                m.game_id = game_id.to_string();
            }
            m.normalized_teams()
        }))
    }

    fn authoritative_goals(&self, game_id: &str) -> Result<Option<Vec<RawGoalRecord>>, ReconError> {
        self.read_json(game_id, &self.layout.file)
    }

    fn derived_goals(
        &self,
        game_id: &str,
        source: SourceId,
    ) -> Result<Option<DerivedFeed>, ReconError> {
        match self.files.get(&source) {
            Some(file) => self.read_json(game_id, file),
            None => Err(ReconError::SourceUnavailable {
                source,
                reason: "source not configured".into(),
            }),
        }
    }

    fn roster(&self, game_id: &str) -> Result<Vec<RosterEntry>, ReconError> {
        let path = self.game_dir(game_id).join(&self.layout.roster_file);
        match read_optional(&path)? {
            Some(text) => load_roster_csv(&text),
            None => {
                warn!("game {game_id}: no roster at {}", path.display());
                Ok(Vec::new())
            }
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ReconError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReconError::Io(format!("{}: {e}", path.display()))),
    }
}

fn parse_json<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T, ReconError> {
    serde_json::from_str(text).map_err(|e| ReconError::FeedParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
