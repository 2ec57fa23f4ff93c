//! Per-(subscriber, area) tracking ledger

use super::{area_list, push_in_list};
use crate::error::{AlertError, Result};
use crate::types::{AlertSet, Subscription};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

#[derive(Clone)]
pub struct SubscriptionLedger {
    pool: SqlitePool,
}

impl SubscriptionLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start tracking `area` for `subscriber_id`
    ///
    /// Fails with [`AlertError::AlreadyTracking`] if the pair already exists.
    pub async fn track(&self, subscriber_id: i64, area: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (subscriber_id, area, notified)
            VALUES (?, ?, 0)
            ON CONFLICT(subscriber_id, area) DO NOTHING
            "#,
        )
        .bind(subscriber_id)
        .bind(area)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AlertError::AlreadyTracking {
                subscriber_id,
                area: area.to_string(),
            });
        }
        Ok(())
    }

    /// Stop tracking; returns whether a row was removed (absent rows are not an error)
    pub async fn stop_tracking(&self, subscriber_id: i64, area: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND area = ?")
            .bind(subscriber_id)
            .bind(area)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_tracking(&self, subscriber_id: i64) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            r#"
            SELECT subscriber_id, area, notified
            FROM subscriptions
            WHERE subscriber_id = ?
            ORDER BY area
            "#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;

        hydrate_all(rows)
    }

    /// Not-yet-notified subscriptions whose area is active, ordered by subscriber
    pub async fn eligible(&self, active: &AlertSet) -> Result<Vec<Subscription>> {
        if active.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT subscriber_id, area, notified FROM subscriptions WHERE notified = 0 AND area IN ",
        );
        push_in_list(&mut query, area_list(active));
        query.push(" ORDER BY subscriber_id, area");

        let rows = query.build().fetch_all(&self.pool).await?;
        hydrate_all(rows)
    }

    /// Notified subscriptions whose area is no longer active
    ///
    /// With an empty `active` set every notified subscription has ended.
    pub async fn alert_ended(&self, active: &AlertSet) -> Result<Vec<Subscription>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT subscriber_id, area, notified FROM subscriptions WHERE notified = 1",
        );
        if !active.is_empty() {
            query.push(" AND area NOT IN ");
            push_in_list(&mut query, area_list(active));
        }
        query.push(" ORDER BY subscriber_id, area");

        let rows = query.build().fetch_all(&self.pool).await?;
        hydrate_all(rows)
    }

    pub async fn mark_notified(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET notified = 1 WHERE subscriber_id = ? AND area = ?")
            .bind(subscription.subscriber_id)
            .bind(&subscription.area)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clear `notified` on every subscription whose area is not in `active`
    ///
    /// Returns the number of rows flipped back to un-notified.
    pub async fn unmark(&self, active: &AlertSet) -> Result<u64> {
        let mut query =
            QueryBuilder::<Sqlite>::new("UPDATE subscriptions SET notified = 0 WHERE notified = 1");
        if !active.is_empty() {
            query.push(" AND area NOT IN ");
            push_in_list(&mut query, area_list(active));
        }

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn hydrate_subscription(row: SqliteRow) -> Result<Subscription> {
    Ok(Subscription {
        subscriber_id: row.try_get("subscriber_id")?,
        area: row.try_get("area")?,
        notified: row.try_get("notified")?,
    })
}

fn hydrate_all(rows: Vec<SqliteRow>) -> Result<Vec<Subscription>> {
    rows.into_iter().map(hydrate_subscription).collect()
}
