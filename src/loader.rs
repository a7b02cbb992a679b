//! Upserts normalized rows into Postgres.
//!
//! Each `load` call opens its own connection and transaction; nothing is
//! pooled across tables or runs. Tables are expected to exist already.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::error::EtlError;
use crate::models::{FixtureRow, Resource, RowBatch, ScorerRow, StandingRow};

/// Persists one batch atomically, returning the number of rows upserted.
#[allow(async_fn_in_trait)]
pub trait Loader {
    async fn load(&self, batch: &RowBatch) -> Result<u64, EtlError>;
}

const UPSERT_STANDING: &str = r#"
    INSERT INTO standings (
        team_id, team_name, position, played_games, won, draw, lost,
        points, goals_for, goals_against, goal_difference, last_update
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (team_id) DO UPDATE SET
        team_name = EXCLUDED.team_name,
        position = EXCLUDED.position,
        played_games = EXCLUDED.played_games,
        won = EXCLUDED.won,
        draw = EXCLUDED.draw,
        lost = EXCLUDED.lost,
        points = EXCLUDED.points,
        goals_for = EXCLUDED.goals_for,
        goals_against = EXCLUDED.goals_against,
        goal_difference = EXCLUDED.goal_difference,
        last_update = EXCLUDED.last_update
"#;

const UPSERT_SCORER: &str = r#"
    INSERT INTO scorers (
        player_id, player_name, team_name, goals, assists, last_update
    ) VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (player_id) DO UPDATE SET
        player_name = EXCLUDED.player_name,
        team_name = EXCLUDED.team_name,
        goals = EXCLUDED.goals,
        assists = EXCLUDED.assists,
        last_update = EXCLUDED.last_update
"#;

const UPSERT_FIXTURE: &str = r#"
    INSERT INTO fixtures (
        match_id, utc_date, home_team, away_team, status,
        home_score, away_score, last_update
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (match_id) DO UPDATE SET
        utc_date = EXCLUDED.utc_date,
        home_team = EXCLUDED.home_team,
        away_team = EXCLUDED.away_team,
        status = EXCLUDED.status,
        home_score = EXCLUDED.home_score,
        away_score = EXCLUDED.away_score,
        last_update = EXCLUDED.last_update
"#;

/// Postgres loader for the standings, scorers and fixtures tables
pub struct PgLoader {
    options: PgConnectOptions,
}

impl PgLoader {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    async fn upsert_standings(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[StandingRow],
        loaded_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        for row in rows {
            sqlx::query(UPSERT_STANDING)
                .bind(row.team_id)
                .bind(&row.team_name)
                .bind(row.position)
                .bind(row.played_games)
                .bind(row.won)
                .bind(row.draw)
                .bind(row.lost)
                .bind(row.points)
                .bind(row.goals_for)
                .bind(row.goals_against)
                .bind(row.goal_difference)
                .bind(loaded_at)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn upsert_scorers(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[ScorerRow],
        loaded_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        for row in rows {
            sqlx::query(UPSERT_SCORER)
                .bind(row.player_id)
                .bind(&row.player_name)
                .bind(&row.team_name)
                .bind(row.goals)
                .bind(row.assists)
                .bind(loaded_at)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn upsert_fixtures(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[FixtureRow],
        loaded_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        for row in rows {
            sqlx::query(UPSERT_FIXTURE)
                .bind(row.match_id)
                .bind(row.utc_date)
                .bind(&row.home_team)
                .bind(&row.away_team)
                .bind(&row.status)
                .bind(row.home_score)
                .bind(row.away_score)
                .bind(loaded_at)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn load_inner(&self, batch: &RowBatch) -> Result<u64, sqlx::Error> {
        let mut conn = PgConnection::connect_with(&self.options).await?;
        let mut tx = conn.begin().await?;
        let loaded_at = Utc::now();

        // Dropping `tx` on an error rolls the whole batch back.
        match batch {
            RowBatch::Standings(rows) => Self::upsert_standings(&mut tx, rows, loaded_at).await?,
            RowBatch::Scorers(rows) => Self::upsert_scorers(&mut tx, rows, loaded_at).await?,
            RowBatch::Fixtures(rows) => Self::upsert_fixtures(&mut tx, rows, loaded_at).await?,
        }

        tx.commit().await?;
        Ok(committed(batch, conn.close().await))
    }
}

/// Row count of a committed batch. The rows are durable once the commit
/// succeeded, so a failed close is only logged.
fn committed(batch: &RowBatch, closed: Result<(), sqlx::Error>) -> u64 {
    if let Err(e) = closed {
        warn!(
            "Committed {} rows to {} but closing the connection failed: {}",
            batch.len(),
            batch.resource().table(),
            e
        );
    }
    batch.len() as u64
}

impl Loader for PgLoader {
    async fn load(&self, batch: &RowBatch) -> Result<u64, EtlError> {
        let resource: Resource = batch.resource();
        debug!("Upserting {} rows into {}", batch.len(), resource.table());

        let count = self
            .load_inner(batch)
            .await
            .map_err(|e| EtlError::storage(resource, e))?;

        info!("Stored {} rows in {}", count, resource.table());
        Ok(count)
    }
}
