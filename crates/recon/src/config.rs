use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::identity::TeamDirectory;
use crate::model::SourceId;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Largest total absolute delta still reported as a minor discrepancy.
    #[serde(default = "default_minor_threshold")]
    pub minor_threshold: u32,
    #[serde(default)]
    pub authoritative: AuthoritativeConfig,
    /// Derived sources to compare, keyed by source name. Omitting the table
    /// compares all three with their stock profiles.
    #[serde(default = "default_sources")]
    pub sources: BTreeMap<String, SourceProfile>,
    /// Team id -> abbreviation, for feeds that name teams by number.
    #[serde(default)]
    pub teams: BTreeMap<String, String>,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_minor_threshold() -> u32 {
    2
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            minor_threshold: default_minor_threshold(),
            authoritative: AuthoritativeConfig::default(),
            sources: default_sources(),
            teams: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Authoritative feed layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AuthoritativeConfig {
    #[serde(default = "default_authoritative_file")]
    pub file: String,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
}

fn default_authoritative_file() -> String {
    "authoritative.json".to_string()
}

fn default_metadata_file() -> String {
    "metadata.json".to_string()
}

fn default_roster_file() -> String {
    "roster.csv".to_string()
}

impl Default for AuthoritativeConfig {
    fn default() -> Self {
        Self {
            file: default_authoritative_file(),
            metadata_file: default_metadata_file(),
            roster_file: default_roster_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived source profiles
// ---------------------------------------------------------------------------

/// What a derived feed is able to report. Quantities a feed cannot report
/// are never compared, so the feed is not charged a deficit for them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceProfile {
    #[serde(default)]
    pub label: String,
    pub file: String,
    #[serde(default)]
    pub phases: PhaseResolution,
    #[serde(default = "default_true")]
    pub assists: bool,
    #[serde(default)]
    pub shootout_goals: bool,
    #[serde(default = "default_true")]
    pub shootout_outcome: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseResolution {
    /// Regular time and overtime are reported separately.
    #[default]
    Exact,
    /// Only the regular+overtime total is reported.
    Combined,
}

impl SourceProfile {
    pub fn game_summary() -> Self {
        Self {
            label: "game summary".into(),
            file: "derived_a.json".into(),
            phases: PhaseResolution::Exact,
            assists: true,
            shootout_goals: false,
            shootout_outcome: true,
        }
    }

    pub fn event_summary() -> Self {
        Self {
            label: "event summary".into(),
            file: "derived_b.json".into(),
            phases: PhaseResolution::Combined,
            assists: true,
            shootout_goals: false,
            shootout_outcome: false,
        }
    }

    pub fn play_by_play() -> Self {
        Self {
            label: "play-by-play".into(),
            file: "derived_c.json".into(),
            phases: PhaseResolution::Exact,
            assists: false,
            shootout_goals: true,
            shootout_outcome: true,
        }
    }
}

fn default_sources() -> BTreeMap<String, SourceProfile> {
    BTreeMap::from([
        (SourceId::DerivedA.as_str().to_string(), SourceProfile::game_summary()),
        (SourceId::DerivedB.as_str().to_string(), SourceProfile::event_summary()),
        (SourceId::DerivedC.as_str().to_string(), SourceProfile::play_by_play()),
    ])
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.derived_sources()?;

        for (name, profile) in &self.sources {
            if profile.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{name}': file must not be empty"
                )));
            }
        }

        if self.authoritative.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "authoritative.file must not be empty".into(),
            ));
        }

        self.team_directory()?;
        Ok(())
    }

    /// Configured derived sources in source order.
    pub fn derived_sources(&self) -> Result<Vec<(SourceId, &SourceProfile)>, ReconError> {
        let mut out = Vec::with_capacity(self.sources.len());
        for (name, profile) in &self.sources {
            let source: SourceId = name.parse()?;
            if source.is_authoritative() {
                return Err(ReconError::ConfigValidation(
                    "'authoritative' cannot be configured as a derived source".into(),
                ));
            }
            out.push((source, profile));
        }
        out.sort_by_key(|(source, _)| *source);
        Ok(out)
    }

    pub fn profile(&self, source: SourceId) -> Option<&SourceProfile> {
        self.sources.get(source.as_str())
    }

    pub fn team_directory(&self) -> Result<TeamDirectory, ReconError> {
        let mut by_id = BTreeMap::new();
        for (key, abbrev) in &self.teams {
            let id: u32 = key.trim().parse().map_err(|_| {
                ReconError::ConfigValidation(format!("team id '{key}' is not a number"))
            })?;
            let abbrev = abbrev.trim();
            if abbrev.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "team id {id}: abbreviation must not be empty"
                )));
            }
            by_id.insert(id, abbrev.to_string());
        }
        Ok(TeamDirectory::new(by_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TeamRef;

    const FULL: &str = r#"
name = "NHL 2023-24"
minor_threshold = 2

[authoritative]
file = "api.json"
metadata_file = "game.json"
roster_file = "players.csv"

[sources.derived_a]
label = "game summary"
file = "gs.json"
phases = "exact"
assists = true
shootout_outcome = true

[sources.derived_b]
label = "event summary"
file = "es.json"
phases = "combined"

[teams]
1 = "NJD"
10 = "TOR"
"#;

    #[test]
    fn parse_full_config() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "NHL 2023-24");
        assert_eq!(config.minor_threshold, 2);
        assert_eq!(config.authoritative.file, "api.json");
        assert_eq!(config.authoritative.roster_file, "players.csv");

        let sources = config.derived_sources().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].0, SourceId::DerivedA);
        assert_eq!(sources[1].0, SourceId::DerivedB);

        let b = config.profile(SourceId::DerivedB).unwrap();
        assert_eq!(b.phases, PhaseResolution::Combined);
        assert!(b.assists, "assists default to true");
        assert!(!b.shootout_goals);
        assert!(config.profile(SourceId::DerivedC).is_none());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config.name, "default");
        assert_eq!(config.minor_threshold, 2);
        assert_eq!(config.authoritative.file, "authoritative.json");
        assert_eq!(config.authoritative.metadata_file, "metadata.json");

        let sources = config.derived_sources().unwrap();
        let ids: Vec<SourceId> = sources.iter().map(|(s, _)| *s).collect();
        assert_eq!(ids, SourceId::DERIVED.to_vec());

        let c = config.profile(SourceId::DerivedC).unwrap();
        assert!(!c.assists);
        assert!(c.shootout_goals);
    }

    #[test]
    fn team_directory_resolves_ids() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        let teams = config.team_directory().unwrap();
        assert_eq!(teams.resolve(&TeamRef::Id(10)).unwrap(), "TOR");
        assert_eq!(teams.resolve(&TeamRef::Id(1)).unwrap(), "NJD");
        assert_eq!(
            teams.resolve(&TeamRef::Id(99)).unwrap_err(),
            ReconError::UnknownTeam(99)
        );
    }

    #[test]
    fn reject_unknown_source() {
        let input = r#"
[sources.derived_z]
file = "z.json"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert_eq!(err, ReconError::UnknownSource("derived_z".into()));
    }

    #[test]
    fn reject_authoritative_as_derived() {
        let input = r#"
[sources.authoritative]
file = "a.json"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'authoritative'"));
    }

    #[test]
    fn reject_non_numeric_team_id() {
        let input = r#"
[teams]
TOR = "TOR"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("team id 'TOR' is not a number"));
    }

    #[test]
    fn reject_empty_abbreviation() {
        let input = r#"
[teams]
5 = " "
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("team id 5"));
    }

    #[test]
    fn reject_bad_phase_resolution() {
        let input = r#"
[sources.derived_a]
file = "a.json"
phases = "approximate"
"#;
        assert!(matches!(
            ReconConfig::from_toml(input),
            Err(ReconError::ConfigParse(_))
        ));
    }

    #[test]
    fn zero_threshold_is_allowed() {
        let config = ReconConfig::from_toml("minor_threshold = 0").unwrap();
        assert_eq!(config.minor_threshold, 0);
    }
}
