//! Persistent cache key -> rendered map handle

use crate::error::{AlertError, Result};
use crate::types::MapArtifact;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

#[derive(Clone)]
pub struct MapArtifactStore {
    pool: SqlitePool,
}

impl MapArtifactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<MapArtifact>> {
        let row = sqlx::query(
            r#"
            SELECT alerts_key, handle, created_at, updated_at
            FROM map_artifacts
            WHERE alerts_key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(hydrate_artifact).transpose()
    }

    /// Record `handle` for `key`; the first writer wins
    ///
    /// If another writer already stored `key`, its row is returned unchanged.
    pub async fn insert(&self, key: &str, handle: &str) -> Result<MapArtifact> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO map_artifacts (alerts_key, handle, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(alerts_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(handle)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Map artifact for '{}' already stored, keeping first", key);
        }

        self.get(key).await?.ok_or_else(|| {
            AlertError::Storage(format!("map artifact '{}' missing after insert", key))
        })
    }
}

fn hydrate_artifact(row: SqliteRow) -> Result<MapArtifact> {
    Ok(MapArtifact {
        key: row.try_get("alerts_key")?,
        handle: row.try_get("handle")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
