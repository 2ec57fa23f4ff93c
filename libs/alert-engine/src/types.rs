//! Alert, subscription and map artifact types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// An active alert for one area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Area identifier, the alert's identity
    pub id: String,
    /// Alert category (e.g. "a" for air raid)
    pub kind: String,
}

impl Alert {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Set of active alerts keyed by area id
///
/// Inserting an alert whose id is already present replaces the previous one,
/// so the set never holds two alerts for the same area. Iteration is in
/// ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSet {
    alerts: BTreeMap<String, Alert>,
}

impl AlertSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alert: Alert) -> Option<Alert> {
        self.alerts.insert(alert.id.clone(), alert)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.alerts.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.get(id)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    /// Area ids in ascending order
    pub fn ids(&self) -> Vec<&str> {
        self.alerts.keys().map(String::as_str).collect()
    }

    /// Canonical cache key: sorted ids joined with ",", "" for the empty set
    pub fn cache_key(&self) -> String {
        self.ids().join(",")
    }
}

impl FromIterator<Alert> for AlertSet {
    fn from_iter<I: IntoIterator<Item = Alert>>(iter: I) -> Self {
        let mut set = AlertSet::new();
        for alert in iter {
            set.insert(alert);
        }
        set
    }
}

impl IntoIterator for AlertSet {
    type Item = Alert;
    type IntoIter = std::collections::btree_map::IntoValues<String, Alert>;

    fn into_iter(self) -> Self::IntoIter {
        self.alerts.into_values()
    }
}

impl Serialize for AlertSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.alerts.values())
    }
}

impl<'de> Deserialize<'de> for AlertSet {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let alerts = Vec::<Alert>::deserialize(deserializer)?;
        Ok(alerts.into_iter().collect())
    }
}

/// A subscriber's standing interest in one area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: i64,
    pub area: String,
    /// True while the subscriber has been told `area` is alerting and not yet told it ended
    pub notified: bool,
}

impl Subscription {
    pub fn new(subscriber_id: i64, area: impl Into<String>) -> Self {
        Self {
            subscriber_id,
            area: area.into(),
            notified: false,
        }
    }
}

/// Durable reference to a rendered map for one alert combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapArtifact {
    /// Canonical alert-set key, see [`AlertSet::cache_key`]
    pub key: String,
    /// Opaque handle of the stored image (e.g. a transport file id)
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
