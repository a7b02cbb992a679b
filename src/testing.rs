//! Test doubles for the fetch and load seams.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use crate::error::EtlError;
use crate::fetcher::Fetcher;
use crate::loader::Loader;
use crate::models::{FixtureRow, Resource, RowBatch, ScorerRow, StandingRow};

pub fn sample_payload(resource: Resource) -> Value {
    match resource {
        Resource::Standings => json!({
            "competition": { "code": "PL" },
            "standings": [{
                "stage": "REGULAR_SEASON",
                "type": "TOTAL",
                "table": [
                    { "position": 1, "team": { "id": 57, "name": "Arsenal FC" }, "playedGames": 8,
                      "won": 6, "draw": 1, "lost": 1, "points": 19, "goalsFor": 15, "goalsAgainst": 3, "goalDifference": 12 },
                    { "position": 2, "team": { "id": 65, "name": "Manchester City FC" }, "playedGames": 8,
                      "won": 5, "draw": 1, "lost": 2, "points": 16, "goalsFor": 17, "goalsAgainst": 6, "goalDifference": 11 },
                    { "position": 3, "team": { "id": 64, "name": "Liverpool FC" }, "playedGames": 8,
                      "won": 5, "draw": 0, "lost": 3, "points": 15, "goalsFor": 14, "goalsAgainst": 12, "goalDifference": 2 }
                ]
            }]
        }),
        Resource::Scorers => json!({
            "count": 2,
            "scorers": [
                { "player": { "id": 38101, "name": "Erling Haaland" }, "team": { "id": 65, "name": "Manchester City FC" },
                  "goals": 11, "assists": 1 },
                { "player": { "id": 7802, "name": "Danny Welbeck" }, "team": { "id": 397, "name": "Brighton & Hove Albion FC" },
                  "goals": 5 }
            ]
        }),
        Resource::Fixtures => json!({
            "matches": [
                { "id": 537785, "utcDate": "2026-08-15T19:00:00Z", "status": "FINISHED",
                  "homeTeam": { "id": 64, "name": "Liverpool FC" }, "awayTeam": { "id": 1044, "name": "AFC Bournemouth" },
                  "score": { "winner": "HOME_TEAM", "fullTime": { "home": 4, "away": 2 } } },
                { "id": 538100, "utcDate": "2026-12-26T15:00:00Z", "status": "TIMED",
                  "homeTeam": { "id": 57, "name": "Arsenal FC" }, "awayTeam": { "id": 61, "name": "Chelsea FC" },
                  "score": { "winner": null, "fullTime": { "home": null, "away": null } } }
            ]
        }),
    }
}

/// Serves canned payloads; selected resources fail with a 503.
pub struct ScriptedFetcher {
    payloads: HashMap<Resource, Value>,
    failures: Mutex<HashSet<Resource>>,
    calls: Mutex<Vec<Resource>>,
}

impl ScriptedFetcher {
    pub fn all_ok() -> Self {
        Self {
            payloads: Resource::ALL.iter().map(|&r| (r, sample_payload(r))).collect(),
            failures: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(self, resource: Resource) -> Self {
        self.failures.lock().unwrap().insert(resource);
        self
    }

    pub fn with_payload(mut self, resource: Resource, payload: Value) -> Self {
        self.payloads.insert(resource, payload);
        self
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Resource> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, resource: Resource) -> Result<Value, EtlError> {
        self.calls.lock().unwrap().push(resource);
        if self.failures.lock().unwrap().contains(&resource) {
            return Err(EtlError::Status {
                resource,
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(self.payloads[&resource].clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub row: T,
    pub last_update: DateTime<Utc>,
}

#[derive(Default, Clone)]
struct Tables {
    standings: BTreeMap<i64, Stored<StandingRow>>,
    scorers: BTreeMap<i64, Stored<ScorerRow>>,
    fixtures: BTreeMap<i64, Stored<FixtureRow>>,
}

/// In-memory tables with the same overwrite-on-conflict and
/// all-or-nothing batch semantics as `PgLoader`.
#[derive(Default)]
pub struct MemoryLoader {
    tables: Mutex<Tables>,
    fail_on: Option<Resource>,
    order: Mutex<Vec<Resource>>,
}

impl MemoryLoader {
    /// Loads into `resource` fail after the first row has been written.
    pub fn failing_on(mut self, resource: Resource) -> Self {
        self.fail_on = Some(resource);
        self
    }

    pub fn row_count(&self, resource: Resource) -> usize {
        let tables = self.tables.lock().unwrap();
        match resource {
            Resource::Standings => tables.standings.len(),
            Resource::Scorers => tables.scorers.len(),
            Resource::Fixtures => tables.fixtures.len(),
        }
    }

    /// Tables committed to, in order.
    pub fn load_order(&self) -> Vec<Resource> {
        self.order.lock().unwrap().clone()
    }

    pub fn standing(&self, team_id: i64) -> Option<Stored<StandingRow>> {
        self.tables.lock().unwrap().standings.get(&team_id).cloned()
    }

    pub fn standings_snapshot(&self) -> Vec<Stored<StandingRow>> {
        self.tables.lock().unwrap().standings.values().cloned().collect()
    }

    pub fn fixtures_snapshot(&self) -> Vec<Stored<FixtureRow>> {
        self.tables.lock().unwrap().fixtures.values().cloned().collect()
    }

    pub fn seed_fixture(&self, match_id: i64, status: &str) -> Stored<FixtureRow> {
        let stored = Stored {
            row: FixtureRow {
                match_id,
                utc_date: Utc.with_ymd_and_hms(2026, 5, 24, 15, 0, 0).unwrap(),
                home_team: "Old Home FC".to_string(),
                away_team: "Old Away FC".to_string(),
                status: status.to_string(),
                home_score: None,
                away_score: None,
            },
            last_update: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap(),
        };
        self.tables
            .lock()
            .unwrap()
            .fixtures
            .insert(match_id, stored.clone());
        stored
    }
}

fn upsert<T: Clone>(
    table: &mut BTreeMap<i64, Stored<T>>,
    rows: &[T],
    key: fn(&T) -> i64,
    loaded_at: DateTime<Utc>,
    fail_after_first: bool,
) -> Result<(), sqlx::Error> {
    for (i, row) in rows.iter().enumerate() {
        if fail_after_first && i == 1 {
            return Err(sqlx::Error::Protocol("simulated constraint violation".to_string()));
        }
        table.insert(
            key(row),
            Stored {
                row: row.clone(),
                last_update: loaded_at,
            },
        );
    }
    if fail_after_first && rows.len() <= 1 {
        return Err(sqlx::Error::Protocol("simulated constraint violation".to_string()));
    }
    Ok(())
}

impl Loader for MemoryLoader {
    async fn load(&self, batch: &RowBatch) -> Result<u64, EtlError> {
        let resource = batch.resource();
        let fail = self.fail_on == Some(resource);
        let loaded_at = Utc::now();

        let mut tables = self.tables.lock().unwrap();
        let mut staged = tables.clone();
        let result = match batch {
            RowBatch::Standings(rows) => upsert(&mut staged.standings, rows, |r: &StandingRow| r.team_id, loaded_at, fail),
            RowBatch::Scorers(rows) => upsert(&mut staged.scorers, rows, |r: &ScorerRow| r.player_id, loaded_at, fail),
            RowBatch::Fixtures(rows) => upsert(&mut staged.fixtures, rows, |r: &FixtureRow| r.match_id, loaded_at, fail),
        };
        result.map_err(|e| EtlError::storage(resource, e))?;

        *tables = staged;
        self.order.lock().unwrap().push(resource);
        Ok(batch.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{records, transform_batch};

    fn standings_batch() -> RowBatch {
        let payload = sample_payload(Resource::Standings);
        transform_batch(Resource::Standings, records(Resource::Standings, &payload).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn loading_same_row_twice_keeps_one_row_with_latest_values() {
        let loader = MemoryLoader::default();
        let mut batch = standings_batch();

        loader.load(&batch).await.unwrap();
        let first = loader.standing(57).unwrap();

        if let RowBatch::Standings(rows) = &mut batch {
            rows[0].points = 22;
            rows[0].played_games = 9;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        loader.load(&batch).await.unwrap();

        let second = loader.standing(57).unwrap();
        assert_eq!(loader.row_count(Resource::Standings), 3);
        assert_eq!(second.row.points, 22);
        assert_eq!(second.row.played_games, 9);
        assert!(second.last_update > first.last_update);
    }

    #[tokio::test]
    async fn batch_rows_are_stamped_within_the_call() {
        let loader = MemoryLoader::default();
        let batch = standings_batch();

        let before = Utc::now();
        let count = loader.load(&batch).await.unwrap();
        let after = Utc::now();

        assert_eq!(count, 3);
        let stored = loader.standings_snapshot();
        assert_eq!(stored.len(), 3);
        assert!(stored
            .iter()
            .all(|s| s.last_update >= before && s.last_update <= after));
    }

    #[tokio::test]
    async fn failed_batch_commits_nothing() {
        let loader = MemoryLoader::default().failing_on(Resource::Standings);

        let err = loader.load(&standings_batch()).await.unwrap_err();

        assert!(matches!(err, EtlError::Storage { table: "standings", .. }));
        assert_eq!(loader.row_count(Resource::Standings), 0);
        assert!(loader.load_order().is_empty());
    }
}
