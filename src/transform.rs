//! Pure payload-to-row mapping. Nothing here performs I/O.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::EtlError;
use crate::models::{
    ApiMatch, ApiScorer, ApiTableEntry, FixtureRow, Resource, RowBatch, ScorerRow, StandingRow,
};

/// Pull the record list out of a resource's response envelope.
///
/// Standings responses carry one table per `type` (TOTAL, HOME, AWAY);
/// the TOTAL table is used, falling back to the first one listed.
pub fn records(resource: Resource, payload: &Value) -> Result<&[Value], EtlError> {
    let list = match resource {
        Resource::Standings => {
            let tables = payload
                .get("standings")
                .and_then(Value::as_array)
                .ok_or_else(|| EtlError::data_shape(resource, "missing `standings` array"))?;
            let total = tables
                .iter()
                .find(|t| t.get("type").and_then(Value::as_str) == Some("TOTAL"))
                .or_else(|| tables.first())
                .ok_or_else(|| EtlError::data_shape(resource, "`standings` array is empty"))?;
            total
                .get("table")
                .ok_or_else(|| EtlError::data_shape(resource, "standings entry has no `table`"))?
        }
        Resource::Scorers => payload
            .get("scorers")
            .ok_or_else(|| EtlError::data_shape(resource, "missing `scorers` array"))?,
        Resource::Fixtures => payload
            .get("matches")
            .ok_or_else(|| EtlError::data_shape(resource, "missing `matches` array"))?,
    };

    list.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| EtlError::data_shape(resource, "record list is not an array"))
}

fn decode<T: DeserializeOwned>(resource: Resource, record: &Value) -> Result<T, EtlError> {
    T::deserialize(record).map_err(|e| EtlError::data_shape(resource, e.to_string()))
}

pub fn transform_standing(record: &Value) -> Result<StandingRow, EtlError> {
    let entry: ApiTableEntry = decode(Resource::Standings, record)?;
    let team_id = entry
        .team
        .id
        .ok_or_else(|| EtlError::data_shape(Resource::Standings, "team entry has no id"))?;

    Ok(StandingRow {
        team_id,
        team_name: entry.team.name,
        position: entry.position,
        played_games: entry.played_games,
        won: entry.won,
        draw: entry.draw,
        lost: entry.lost,
        points: entry.points,
        goals_for: entry.goals_for,
        goals_against: entry.goals_against,
        goal_difference: entry.goal_difference,
    })
}

/// Missing or null `assists` becomes 0.
pub fn transform_scorer(record: &Value) -> Result<ScorerRow, EtlError> {
    let scorer: ApiScorer = decode(Resource::Scorers, record)?;

    Ok(ScorerRow {
        player_id: scorer.player.id,
        player_name: scorer.player.name,
        team_name: scorer.team.name,
        goals: scorer.goals,
        assists: scorer.assists.unwrap_or(0),
    })
}

/// Scores stay `None` until the full-time result exists.
pub fn transform_fixture(record: &Value) -> Result<FixtureRow, EtlError> {
    let m: ApiMatch = decode(Resource::Fixtures, record)?;

    Ok(FixtureRow {
        match_id: m.id,
        utc_date: m.utc_date,
        home_team: m.home_team.name,
        away_team: m.away_team.name,
        status: m.status,
        home_score: m.score.full_time.home,
        away_score: m.score.full_time.away,
    })
}

fn map_all<T>(
    resource: Resource,
    records: &[Value],
    f: fn(&Value) -> Result<T, EtlError>,
) -> Result<Vec<T>, EtlError> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            f(record).map_err(|e| match e {
                EtlError::DataShape { message, .. } => {
                    EtlError::data_shape(resource, format!("record {}: {}", i, message))
                }
                other => other,
            })
        })
        .collect()
}

/// Transform every record of a payload into one batch.
pub fn transform_batch(resource: Resource, records: &[Value]) -> Result<RowBatch, EtlError> {
    Ok(match resource {
        Resource::Standings => RowBatch::Standings(map_all(resource, records, transform_standing)?),
        Resource::Scorers => RowBatch::Scorers(map_all(resource, records, transform_scorer)?),
        Resource::Fixtures => RowBatch::Fixtures(map_all(resource, records, transform_fixture)?),
    })
}
