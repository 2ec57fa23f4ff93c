//! SQLite schema for alerts, subscriptions and map artifacts

use crate::error::Result;
use sqlx::SqlitePool;

pub const ALERTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL
)
"#;

pub const SUBSCRIPTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS subscriptions (
    subscriber_id INTEGER NOT NULL,
    area TEXT NOT NULL,
    notified INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (subscriber_id, area)
)
"#;

pub const SUBSCRIPTIONS_AREA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_area ON subscriptions (area)";

pub const MAP_ARTIFACTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS map_artifacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alerts_key TEXT NOT NULL UNIQUE,
    handle TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Create all tables (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in [
        ALERTS_TABLE,
        SUBSCRIPTIONS_TABLE,
        SUBSCRIPTIONS_AREA_INDEX,
        MAP_ARTIFACTS_TABLE,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
