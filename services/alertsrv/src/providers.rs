//! HTTP alert feed
//!
//! Expected document: `{"alerts": [{"n": "<area>", "t": "<kind>"}, ...]}`

use alert_engine::{Alert, AlertError, AlertSet, AlertSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    alerts: Vec<FeedAlert>,
}

#[derive(Debug, Deserialize)]
struct FeedAlert {
    #[serde(rename = "n")]
    area: String,
    #[serde(rename = "t", default)]
    kind: String,
}

/// Parse a feed document into an alert set
pub fn parse_feed(body: &[u8]) -> alert_engine::Result<AlertSet> {
    let document: FeedDocument = serde_json::from_slice(body)
        .map_err(|e| AlertError::Fetch(format!("malformed alert feed: {}", e)))?;

    Ok(document
        .alerts
        .into_iter()
        .filter(|alert| !alert.area.trim().is_empty())
        .map(|alert| Alert::new(alert.area, alert.kind))
        .collect())
}

pub struct HttpAlertProvider {
    name: String,
    url: String,
    client: Client,
}

impl HttpAlertProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let url = url.into();
        let client = Client::builder().timeout(timeout).build()?;
        let name = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.clone());

        Ok(Self { name, url, client })
    }
}

#[async_trait]
impl AlertSource for HttpAlertProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> alert_engine::Result<AlertSet> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AlertError::Fetch(format!("request to {} failed: {}", self.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Fetch(format!(
                "{} responded with {}",
                self.name, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AlertError::Fetch(format!("reading {} body failed: {}", self.name, e)))?;

        let alerts = parse_feed(&body)?;
        debug!("{} reported {} active alerts", self.name, alerts.len());
        Ok(alerts)
    }
}
