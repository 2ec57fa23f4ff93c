//! Active alert set persistence

use super::{area_list, push_in_list};
use crate::error::Result;
use crate::types::{Alert, AlertSet};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, warn};

/// The persisted "currently active" alert set
#[derive(Clone)]
pub struct AlertStore {
    pool: SqlitePool,
}

impl AlertStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the stored set with `alerts` in one transaction
    ///
    /// Upserts every alert, then prunes rows whose id is not in `alerts`, so a
    /// concurrent reader never observes an empty set mid-replace. An upsert
    /// failure rolls the whole replace back. A prune failure only leaves stale
    /// rows behind until the next replace and is logged instead.
    pub async fn replace(&self, alerts: &AlertSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if alerts.is_empty() {
            let result = sqlx::query("DELETE FROM alerts").execute(&mut *tx).await?;
            tx.commit().await?;
            debug!("Cleared active alerts ({} removed)", result.rows_affected());
            return Ok(());
        }

        for alert in alerts.iter() {
            sqlx::query(
                r#"
                INSERT INTO alerts (id, kind)
                VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET kind = excluded.kind
                "#,
            )
            .bind(&alert.id)
            .bind(&alert.kind)
            .execute(&mut *tx)
            .await?;
        }

        let mut prune = QueryBuilder::<Sqlite>::new("DELETE FROM alerts WHERE id NOT IN ");
        push_in_list(&mut prune, area_list(alerts));

        match prune.build().execute(&mut *tx).await {
            Ok(result) => debug!(
                "Replaced active alerts: {} active, {} pruned",
                alerts.len(),
                result.rows_affected()
            ),
            Err(e) => warn!("Failed to prune stale alerts: {}", e),
        }

        tx.commit().await?;
        Ok(())
    }

    /// Snapshot of the stored set
    pub async fn current(&self) -> Result<AlertSet> {
        let rows = sqlx::query("SELECT id, kind FROM alerts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut set = AlertSet::new();
        for row in rows {
            set.insert(Alert {
                id: row.try_get("id")?,
                kind: row.try_get("kind")?,
            });
        }
        Ok(set)
    }
}
