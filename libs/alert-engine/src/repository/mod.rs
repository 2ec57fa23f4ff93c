//! SQLite persistence for the active alert set, subscriptions and map artifacts

mod alerts;
mod maps;
mod subscriptions;

pub use alerts::AlertStore;
pub use maps::MapArtifactStore;
pub use subscriptions::SubscriptionLedger;

use sqlx::{QueryBuilder, Sqlite};

/// Append `(?, ?, ...)` with one bound parameter per value
///
/// Callers must not pass an empty list: `IN ()` is not valid SQLite.
fn push_in_list<I>(builder: &mut QueryBuilder<'_, Sqlite>, values: I)
where
    I: IntoIterator<Item = String>,
{
    builder.push("(");
    let mut separated = builder.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

/// Owned area ids of an alert set, in ascending order
fn area_list(alerts: &crate::types::AlertSet) -> Vec<String> {
    alerts.ids().into_iter().map(str::to_string).collect()
}
