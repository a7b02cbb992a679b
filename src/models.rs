//! Raw football-data.org records and the normalized rows stored in Postgres.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// One of the three data categories synced from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Standings,
    Scorers,
    Fixtures,
}

impl Resource {
    /// Fixed run order.
    pub const ALL: [Resource; 3] = [Resource::Standings, Resource::Scorers, Resource::Fixtures];

    /// Path segment under `/competitions/{code}/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            Resource::Standings => "standings",
            Resource::Scorers => "scorers",
            Resource::Fixtures => "matches",
        }
    }

    /// Destination table.
    pub fn table(self) -> &'static str {
        match self {
            Resource::Standings => "standings",
            Resource::Scorers => "scorers",
            Resource::Fixtures => "fixtures",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TeamRef {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerRef {
    pub id: i64,
    pub name: String,
}

/// Entry of `standings[].table`
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTableEntry {
    pub position: i32,
    pub team: TeamRef,
    pub played_games: i32,
    pub won: i32,
    pub draw: i32,
    pub lost: i32,
    pub points: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
}

/// Entry of `scorers`
#[derive(Debug, Deserialize, Clone)]
pub struct ApiScorer {
    pub player: PlayerRef,
    pub team: TeamRef,
    pub goals: i32,
    #[serde(default)]
    pub assists: Option<i32>,
}

/// Entry of `matches`
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiMatch {
    pub id: i64,
    pub utc_date: DateTime<Utc>,
    pub status: String,
    pub home_team: TeamRef,
    pub away_team: TeamRef,
    pub score: ApiScore,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiScore {
    pub full_time: ApiScoreLine,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiScoreLine {
    #[serde(default)]
    pub home: Option<i32>,
    #[serde(default)]
    pub away: Option<i32>,
}

/// Row of the `standings` table, keyed by `team_id`.
///
/// `last_update` is not carried here: the loader stamps it at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingRow {
    pub team_id: i64,
    pub team_name: String,
    pub position: i32,
    pub played_games: i32,
    pub won: i32,
    pub draw: i32,
    pub lost: i32,
    pub points: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
}

/// Row of the `scorers` table, keyed by `player_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerRow {
    pub player_id: i64,
    pub player_name: String,
    pub team_name: String,
    pub goals: i32,
    pub assists: i32,
}

/// Row of the `fixtures` table, keyed by `match_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRow {
    pub match_id: i64,
    pub utc_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub status: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

/// Same-kind rows bound for one table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBatch {
    Standings(Vec<StandingRow>),
    Scorers(Vec<ScorerRow>),
    Fixtures(Vec<FixtureRow>),
}

impl RowBatch {
    pub fn resource(&self) -> Resource {
        match self {
            RowBatch::Standings(_) => Resource::Standings,
            RowBatch::Scorers(_) => Resource::Scorers,
            RowBatch::Fixtures(_) => Resource::Fixtures,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowBatch::Standings(rows) => rows.len(),
            RowBatch::Scorers(rows) => rows.len(),
            RowBatch::Fixtures(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
