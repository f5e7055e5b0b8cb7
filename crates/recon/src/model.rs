use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;

pub type PlayerId = u64;

// ---------------------------------------------------------------------------
// Sources + phases
// ---------------------------------------------------------------------------

/// One feed describing a game's scoring plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Authoritative,
    DerivedA,
    DerivedB,
    DerivedC,
}

impl SourceId {
    pub const DERIVED: [SourceId; 3] = [Self::DerivedA, Self::DerivedB, Self::DerivedC];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authoritative => "authoritative",
            Self::DerivedA => "derived_a",
            Self::DerivedB => "derived_b",
            Self::DerivedC => "derived_c",
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authoritative" => Ok(Self::Authoritative),
            "derived_a" => Ok(Self::DerivedA),
            "derived_b" => Ok(Self::DerivedB),
            "derived_c" => Ok(Self::DerivedC),
            other => Err(ReconError::UnknownSource(other.to_string())),
        }
    }
}

/// Temporal segment of a game. Shootout goals are not official statistics
/// and never carry assists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RegularTime,
    Overtime,
    Shootout,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Self::RegularTime, Self::Overtime, Self::Shootout];

    pub fn counts_for_statistics(&self) -> bool {
        !matches!(self, Self::Shootout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegularTime => "regular_time",
            Self::Overtime => "overtime",
            Self::Shootout => "shootout",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Raw input (as supplied by feed producers)
// ---------------------------------------------------------------------------

/// A team as a feed names it: abbreviation, or numeric id resolved through
/// the configured team directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamRef {
    Id(u32),
    Abbrev(String),
}

/// Canonical spelling of a team abbreviation: trimmed, upper case.
pub fn team_abbrev(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

impl From<&str> for TeamRef {
    fn from(abbrev: &str) -> Self {
        Self::Abbrev(abbrev.to_string())
    }
}

/// A player mention as printed by one feed. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayerMention {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub sweater_number: Option<u32>,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawPlayerMention {
    pub fn by_number(sweater_number: u32) -> Self {
        Self {
            sweater_number: Some(sweater_number),
            ..Self::default()
        }
    }

    pub fn by_id(player_id: PlayerId) -> Self {
        Self {
            player_id: Some(player_id),
            ..Self::default()
        }
    }
}

/// One goal as a feed reports it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGoalRecord {
    pub period: u32,
    #[serde(default)]
    pub time_in_period: String,
    pub team: TeamRef,
    pub scorer: RawPlayerMention,
    #[serde(default)]
    pub assist1: Option<RawPlayerMention>,
    #[serde(default)]
    pub assist2: Option<RawPlayerMention>,
    /// Explicit shootout flag, for feeds that carry one.
    #[serde(default)]
    pub shootout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: u32,
    pub away: u32,
}

/// A derived feed for one game. `final_score` is the feed's own statement of
/// the final score, when it prints one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFeed {
    #[serde(default)]
    pub records: Vec<RawGoalRecord>,
    #[serde(default)]
    pub final_score: Option<FinalScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub team: String,
    pub sweater_number: u32,
    pub player_id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    #[serde(default)]
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl GameMetadata {
    /// Same metadata with both team abbreviations in canonical form.
    pub fn normalized_teams(mut self) -> Self {
        self.home_team = team_abbrev(&self.home_team);
        self.away_team = team_abbrev(&self.away_team);
        self
    }

    pub fn final_score(&self) -> FinalScore {
        FinalScore {
            home: self.home_score,
            away: self.away_score,
        }
    }

    /// The other team in this game, if `team` played in it.
    pub fn opponent(&self, team: &str) -> Option<&str> {
        if team == self.home_team {
            Some(&self.away_team)
        } else if team == self.away_team {
            Some(&self.home_team)
        } else {
            None
        }
    }

    /// Pick `team`'s side out of a home/away score pair.
    pub fn score_for(&self, score: &FinalScore, team: &str) -> Option<u32> {
        if team == self.home_team {
            Some(score.home)
        } else if team == self.away_team {
            Some(score.away)
        } else {
            None
        }
    }
}

/// Everything the engine needs for one game.
///
/// `derived` holds only the feeds that were actually available; sources that
/// could not be loaded are listed in `unavailable` with the reason. A roster
/// that could not be read leaves `roster` empty and its error in
/// `roster_error`.
#[derive(Debug, Clone)]
pub struct GameInput {
    pub metadata: GameMetadata,
    pub roster: Vec<RosterEntry>,
    pub roster_error: Option<ReconError>,
    pub authoritative: Option<Vec<RawGoalRecord>>,
    pub derived: BTreeMap<SourceId, DerivedFeed>,
    pub unavailable: BTreeMap<SourceId, String>,
}

impl GameInput {
    pub fn new(metadata: GameMetadata, roster: Vec<RosterEntry>) -> Self {
        Self {
            metadata,
            roster,
            roster_error: None,
            authoritative: None,
            derived: BTreeMap::new(),
            unavailable: BTreeMap::new(),
        }
    }

    pub fn with_authoritative(mut self, records: Vec<RawGoalRecord>) -> Self {
        self.authoritative = Some(records);
        self
    }

    pub fn with_derived(mut self, source: SourceId, feed: DerivedFeed) -> Self {
        self.derived.insert(source, feed);
        self
    }

    pub fn with_roster_error(mut self, error: ReconError) -> Self {
        self.roster = Vec::new();
        self.roster_error = Some(error);
        self
    }
}

// ---------------------------------------------------------------------------
// Normalized events
// ---------------------------------------------------------------------------

/// Stable identity for a player across feeds. Mentions that could not be
/// matched to the roster keep their (team, sweater) so their credit is still
/// visible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerKey {
    Resolved { player_id: PlayerId },
    Unresolved { team: String, sweater_number: u32 },
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { player_id } => write!(f, "player {player_id}"),
            Self::Unresolved { team, sweater_number } => {
                write!(f, "unresolved {team} #{sweater_number}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRef {
    pub sweater_number: Option<u32>,
    pub team: String,
    pub raw_name: Option<String>,
    pub resolved_id: Option<PlayerId>,
    pub resolved_name: Option<String>,
}

impl PlayerRef {
    pub fn key(&self) -> Option<PlayerKey> {
        match (self.resolved_id, self.sweater_number) {
            (Some(player_id), _) => Some(PlayerKey::Resolved { player_id }),
            (None, Some(sweater_number)) => Some(PlayerKey::Unresolved {
                team: self.team.clone(),
                sweater_number,
            }),
            (None, None) => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.resolved_name
            .clone()
            .or_else(|| self.raw_name.clone())
            .unwrap_or_else(|| match self.sweater_number {
                Some(n) => format!("#{n}"),
                None => "unknown".to_string(),
            })
    }
}

/// Header fields shared by every event built from one raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeader {
    pub game_id: String,
    pub source: SourceId,
    pub period: u32,
    pub phase: Phase,
    pub time_in_period: String,
    pub team: String,
}

/// One goal in normalized form. Immutable once built; shootout events never
/// carry assists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringEvent {
    game_id: String,
    source: SourceId,
    period: u32,
    phase: Phase,
    time_in_period: String,
    team: String,
    scorer: PlayerRef,
    assist1: Option<PlayerRef>,
    assist2: Option<PlayerRef>,
    counts_for_statistics: bool,
}

impl ScoringEvent {
    /// Build an event. Assists on a shootout event are discarded; the second
    /// return value reports whether that happened.
    pub fn new(
        header: EventHeader,
        scorer: PlayerRef,
        assist1: Option<PlayerRef>,
        assist2: Option<PlayerRef>,
    ) -> (Self, bool) {
        let shootout = header.phase == Phase::Shootout;
        let dropped_assists = shootout && (assist1.is_some() || assist2.is_some());
        let (assist1, assist2) = if shootout { (None, None) } else { (assist1, assist2) };

        let event = Self {
            game_id: header.game_id,
            source: header.source,
            period: header.period,
            phase: header.phase,
            time_in_period: header.time_in_period,
            team: header.team,
            scorer,
            assist1,
            assist2,
            counts_for_statistics: header.phase.counts_for_statistics(),
        };
        (event, dropped_assists)
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_in_period(&self) -> &str {
        &self.time_in_period
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn scorer(&self) -> &PlayerRef {
        &self.scorer
    }

    pub fn assist1(&self) -> Option<&PlayerRef> {
        self.assist1.as_ref()
    }

    pub fn assist2(&self) -> Option<&PlayerRef> {
        self.assist2.as_ref()
    }

    pub fn assists(&self) -> impl Iterator<Item = &PlayerRef> {
        self.assist1.iter().chain(self.assist2.iter())
    }

    pub fn counts_for_statistics(&self) -> bool {
        self.counts_for_statistics
    }
}

// ---------------------------------------------------------------------------
// Tallies + comparisons
// ---------------------------------------------------------------------------

/// Goal/assist counts for one entity, one phase, one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTally {
    pub goals: u32,
    pub assists: u32,
}

impl PhaseTally {
    pub fn new(goals: u32, assists: u32) -> Self {
        Self { goals, assists }
    }

    pub fn is_empty(&self) -> bool {
        self.goals == 0 && self.assists == 0
    }
}

impl std::ops::AddAssign for PhaseTally {
    fn add_assign(&mut self, rhs: Self) {
        self.goals += rhs.goals;
        self.assists += rhs.assists;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Perfect,
    MinorDiscrepancy,
    MajorDiscrepancy,
}

impl ReconciliationStatus {
    /// `Perfect` at zero, `MinorDiscrepancy` up to and including `minor_threshold`.
    pub fn from_total_delta(total_abs_delta: u64, minor_threshold: u32) -> Self {
        if total_abs_delta == 0 {
            Self::Perfect
        } else if total_abs_delta <= u64::from(minor_threshold) {
            Self::MinorDiscrepancy
        } else {
            Self::MajorDiscrepancy
        }
    }

    /// Most severe of `statuses`, `Perfect` when there are none.
    pub fn worst(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses.into_iter().max().unwrap_or(Self::Perfect)
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perfect => write!(f, "perfect"),
            Self::MinorDiscrepancy => write!(f, "minor_discrepancy"),
            Self::MajorDiscrepancy => write!(f, "major_discrepancy"),
        }
    }
}

/// What a single comparison covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    RegularTime,
    Overtime,
    Shootout,
    /// Regular time + overtime, for feeds that only report the combined figure.
    CombinedRegularAndOvertime,
    /// Which team won the shootout (0/1), carried in the `goals` field.
    ShootoutOutcome,
}

impl From<Phase> for ComparisonKind {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::RegularTime => Self::RegularTime,
            Phase::Overtime => Self::Overtime,
            Phase::Shootout => Self::Shootout,
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RegularTime => "regular_time",
            Self::Overtime => "overtime",
            Self::Shootout => "shootout",
            Self::CombinedRegularAndOvertime => "combined_regular_and_overtime",
            Self::ShootoutOutcome => "shootout_outcome",
        };
        f.write_str(s)
    }
}

/// Authoritative vs derived tally for one entity and one comparison kind.
/// Deltas are always computed from the two tallies (`authoritative - derived`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPhaseComparison {
    pub kind: ComparisonKind,
    pub authoritative: PhaseTally,
    pub derived: PhaseTally,
    /// False when the derived feed does not report assists for this entity.
    pub assists_compared: bool,
}

impl EntityPhaseComparison {
    pub fn goal_delta(&self) -> i64 {
        i64::from(self.authoritative.goals) - i64::from(self.derived.goals)
    }

    pub fn assist_delta(&self) -> Option<i64> {
        self.assists_compared
            .then(|| i64::from(self.authoritative.assists) - i64::from(self.derived.assists))
    }

    pub fn total_abs_delta(&self) -> u64 {
        self.goal_delta().unsigned_abs() + self.assist_delta().map_or(0, i64::unsigned_abs)
    }
}

impl Serialize for EntityPhaseComparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.assists_compared { 5 } else { 4 };
        let mut s = serializer.serialize_struct("EntityPhaseComparison", fields)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("authoritative", &self.authoritative)?;
        s.serialize_field("derived", &self.derived)?;
        s.serialize_field("goal_delta", &self.goal_delta())?;
        if let Some(delta) = self.assist_delta() {
            s.serialize_field("assist_delta", &delta)?;
        }
        s.end()
    }
}

/// Which side of a comparison knows about the entity at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityPresence {
    Both,
    /// Missing from the derived feed: counted as a full deficit.
    AuthoritativeOnly,
    /// Missing from the authoritative feed: the derived feed invented it.
    DerivedOnly,
}

/// All comparisons of one entity against one derived source. The status is
/// always classified from the comparisons it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceComparison {
    pub source: SourceId,
    pub presence: EntityPresence,
    comparisons: Vec<EntityPhaseComparison>,
    minor_threshold: u32,
}

impl SourceComparison {
    pub fn new(
        source: SourceId,
        presence: EntityPresence,
        comparisons: Vec<EntityPhaseComparison>,
        minor_threshold: u32,
    ) -> Self {
        Self {
            source,
            presence,
            comparisons,
            minor_threshold,
        }
    }

    pub fn comparisons(&self) -> &[EntityPhaseComparison] {
        &self.comparisons
    }

    pub fn total_abs_delta(&self) -> u64 {
        self.comparisons.iter().map(|c| c.total_abs_delta()).sum()
    }

    pub fn status(&self) -> ReconciliationStatus {
        ReconciliationStatus::from_total_delta(self.total_abs_delta(), self.minor_threshold)
    }

    pub fn comparison(&self, kind: ComparisonKind) -> Option<&EntityPhaseComparison> {
        self.comparisons.iter().find(|c| c.kind == kind)
    }
}

impl Serialize for SourceComparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SourceComparison", 4)?;
        s.serialize_field("source", &self.source)?;
        s.serialize_field("presence", &self.presence)?;
        s.serialize_field("comparisons", &self.comparisons)?;
        s.serialize_field("status", &self.status())?;
        s.end()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerReconciliationResult {
    pub key: PlayerKey,
    pub name: String,
    pub sweater_number: Option<u32>,
    pub team: String,
    pub sources: Vec<SourceComparison>,
}

impl PlayerReconciliationResult {
    pub fn entity(&self) -> EntityRef {
        EntityRef::Player {
            key: self.key.clone(),
            name: self.name.clone(),
            sweater_number: self.sweater_number,
            team: self.team.clone(),
        }
    }

    pub fn source(&self, source: SourceId) -> Option<&SourceComparison> {
        self.sources.iter().find(|s| s.source == source)
    }

    /// Worst status across the compared sources.
    pub fn status(&self) -> ReconciliationStatus {
        ReconciliationStatus::worst(self.sources.iter().map(SourceComparison::status))
    }
}

impl Serialize for PlayerReconciliationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PlayerReconciliationResult", 6)?;
        s.serialize_field("key", &self.key)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("sweater_number", &self.sweater_number)?;
        s.serialize_field("team", &self.team)?;
        s.serialize_field("sources", &self.sources)?;
        s.serialize_field("status", &self.status())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamReconciliationResult {
    pub team: String,
    pub sources: Vec<SourceComparison>,
}

impl TeamReconciliationResult {
    pub fn entity(&self) -> EntityRef {
        EntityRef::Team {
            team: self.team.clone(),
        }
    }

    pub fn source(&self, source: SourceId) -> Option<&SourceComparison> {
        self.sources.iter().find(|s| s.source == source)
    }

    pub fn status(&self) -> ReconciliationStatus {
        ReconciliationStatus::worst(self.sources.iter().map(SourceComparison::status))
    }
}

impl Serialize for TeamReconciliationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TeamReconciliationResult", 3)?;
        s.serialize_field("team", &self.team)?;
        s.serialize_field("sources", &self.sources)?;
        s.serialize_field("status", &self.status())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityRef {
    Player {
        key: PlayerKey,
        name: String,
        sweater_number: Option<u32>,
        team: String,
    },
    Team {
        team: String,
    },
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player { name, sweater_number: Some(n), team, .. } => {
                write!(f, "{name} #{n} ({team})")
            }
            Self::Player { name, sweater_number: None, team, .. } => write!(f, "{name} ({team})"),
            Self::Team { team } => write!(f, "team {team}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Goals,
    Assists,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goals => write!(f, "goals"),
            Self::Assists => write!(f, "assists"),
        }
    }
}

/// One nonzero delta, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaDetail {
    pub source: SourceId,
    pub kind: ComparisonKind,
    pub quantity: Quantity,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalDiscrepancy {
    pub entity: EntityRef,
    pub deltas: Vec<DeltaDetail>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MinorDiscrepancy,
    IdentityNotFound,
    AmbiguousIdentity,
    ShootoutAssistDropped,
    UnknownTeam,
    InvalidRecord,
    SourceUnavailable,
    /// The roster could not be read; every sweater-number mention is unresolved.
    RosterUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deltas: Vec<DeltaDetail>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub perfect: usize,
    pub minor: usize,
    pub major: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ReconciliationStatus) {
        match status {
            ReconciliationStatus::Perfect => self.perfect += 1,
            ReconciliationStatus::MinorDiscrepancy => self.minor += 1,
            ReconciliationStatus::MajorDiscrepancy => self.major += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.perfect + self.minor + self.major
    }
}

impl std::ops::AddAssign for StatusCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.perfect += rhs.perfect;
        self.minor += rhs.minor;
        self.major += rhs.major;
    }
}

/// The unit handed to reporting code: one game, fully reconciled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameReconciliationResult {
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    /// Goals in the authoritative feed, shootout goals included.
    pub total_goals: usize,
    pub sources_compared: Vec<SourceId>,
    pub sources_unavailable: Vec<SourceId>,
    pub teams: Vec<TeamReconciliationResult>,
    pub players: Vec<PlayerReconciliationResult>,
    pub critical_discrepancies: Vec<CriticalDiscrepancy>,
    pub warnings: Vec<Warning>,
    /// Share of entities (players and teams) with `Perfect` status, 0-100.
    pub reconciliation_percentage: f64,
    pub engine_version: String,
}

impl GameReconciliationResult {
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerReconciliationResult> {
        let key = PlayerKey::Resolved { player_id };
        self.players.iter().find(|p| p.key == key)
    }

    pub fn team(&self, team: &str) -> Option<&TeamReconciliationResult> {
        self.teams.iter().find(|t| t.team == team)
    }

    pub fn player_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for p in &self.players {
            counts.record(p.status());
        }
        counts
    }

    pub fn team_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for t in &self.teams {
            counts.record(t.status());
        }
        counts
    }

    pub fn is_perfect(&self) -> bool {
        self.players
            .iter()
            .map(|p| p.status())
            .chain(self.teams.iter().map(|t| t.status()))
            .all(|s| s == ReconciliationStatus::Perfect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(sweater: u32) -> PlayerRef {
        PlayerRef {
            sweater_number: Some(sweater),
            team: "TOR".into(),
            raw_name: None,
            resolved_id: None,
            resolved_name: None,
        }
    }

    fn header(phase: Phase) -> EventHeader {
        EventHeader {
            game_id: "g1".into(),
            source: SourceId::DerivedC,
            period: 5,
            phase,
            time_in_period: "00:00".into(),
            team: "TOR".into(),
        }
    }

    #[test]
    fn shootout_event_never_keeps_assists() {
        let (event, dropped) =
            ScoringEvent::new(header(Phase::Shootout), player(34), Some(player(16)), None);
        assert!(dropped);
        assert!(event.assist1().is_none());
        assert!(!event.counts_for_statistics());

        let (event, dropped) =
            ScoringEvent::new(header(Phase::Overtime), player(34), Some(player(16)), None);
        assert!(!dropped);
        assert_eq!(event.assists().count(), 1);
    }

    #[test]
    fn unresolved_key_uses_team_and_sweater() {
        assert_eq!(
            player(34).key(),
            Some(PlayerKey::Unresolved {
                team: "TOR".into(),
                sweater_number: 34
            })
        );
        let mut resolved = player(34);
        resolved.resolved_id = Some(8479318);
        assert_eq!(resolved.key(), Some(PlayerKey::Resolved { player_id: 8479318 }));
    }

    #[test]
    fn status_thresholds() {
        use ReconciliationStatus::*;
        assert_eq!(ReconciliationStatus::from_total_delta(0, 2), Perfect);
        assert_eq!(ReconciliationStatus::from_total_delta(2, 2), MinorDiscrepancy);
        assert_eq!(ReconciliationStatus::from_total_delta(3, 2), MajorDiscrepancy);
        assert_eq!(ReconciliationStatus::from_total_delta(1, 0), MajorDiscrepancy);
        assert!(Perfect < MinorDiscrepancy && MinorDiscrepancy < MajorDiscrepancy);
    }

    #[test]
    fn comparison_serializes_computed_deltas() {
        let cmp = EntityPhaseComparison {
            kind: ComparisonKind::RegularTime,
            authoritative: PhaseTally::new(2, 1),
            derived: PhaseTally::new(1, 1),
            assists_compared: true,
        };
        let json = serde_json::to_value(cmp).unwrap();
        assert_eq!(json["kind"], "regular_time");
        assert_eq!(json["goal_delta"], 1);
        assert_eq!(json["assist_delta"], 0);

        let goals_only = EntityPhaseComparison {
            assists_compared: false,
            ..cmp
        };
        let json = serde_json::to_value(goals_only).unwrap();
        assert!(json.get("assist_delta").is_none());
    }

    #[test]
    fn source_status_follows_its_comparisons() {
        let mut cmp = EntityPhaseComparison {
            kind: ComparisonKind::RegularTime,
            authoritative: PhaseTally::new(2, 0),
            derived: PhaseTally::new(2, 0),
            assists_compared: false,
        };
        let perfect = SourceComparison::new(SourceId::DerivedA, EntityPresence::Both, vec![cmp], 2);
        assert_eq!(perfect.status(), ReconciliationStatus::Perfect);

        cmp.derived = PhaseTally::new(0, 0);
        let minor = SourceComparison::new(SourceId::DerivedB, EntityPresence::Both, vec![cmp], 2);
        assert_eq!(minor.status(), ReconciliationStatus::MinorDiscrepancy);

        let team = TeamReconciliationResult {
            team: "TOR".into(),
            sources: vec![perfect, minor],
        };
        assert_eq!(team.status(), ReconciliationStatus::MinorDiscrepancy);
        let json = serde_json::to_value(&team).unwrap();
        assert_eq!(json["status"], "minor_discrepancy");
        assert_eq!(json["sources"][0]["status"], "perfect");

        let untouched = TeamReconciliationResult {
            team: "BOS".into(),
            sources: Vec::new(),
        };
        assert_eq!(untouched.status(), ReconciliationStatus::Perfect);
    }

    #[test]
    fn metadata_teams_normalize() {
        let metadata = GameMetadata {
            game_id: "g1".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 13).unwrap(),
            home_team: " mtl".into(),
            away_team: "Tor".into(),
            home_score: 3,
            away_score: 4,
        }
        .normalized_teams();
        assert_eq!(metadata.home_team, "MTL");
        assert_eq!(metadata.opponent("MTL"), Some("TOR"));
        assert_eq!(team_abbrev("bos "), "BOS");
    }

    #[test]
    fn source_id_round_trips_through_str() {
        for source in SourceId::DERIVED {
            assert_eq!(source.as_str().parse::<SourceId>().unwrap(), source);
        }
        assert!("derived_x".parse::<SourceId>().is_err());
    }
}
