//! Common test utilities and helpers

#![allow(dead_code)]

use alert_engine::{
    init_schema, Alert, AlertSet, AlertSource, AlertStore, ArtifactUploader, FakeAlertInjector,
    MapArtifactStore, MapRenderCache, MessageSender, NotificationFanout, Rasterizer,
    ReconciliationEngine, Result, SubscriptionLedger,
};
use alertsrv::{api::routes, AppState};
use async_trait::async_trait;
use ::common::SqliteClient;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const MAP_TEMPLATE: &str = r#"<svg><path data-oblast="X" fill="white" fill-opacity="1"/></svg>"#;

/// Source returning whatever the test last set
#[derive(Default)]
pub struct StaticSource {
    ids: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn set(&self, ids: &[&str]) {
        *self.ids.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
    }
}

#[async_trait]
impl AlertSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<AlertSet> {
        Ok(self
            .ids
            .lock()
            .unwrap()
            .iter()
            .map(|id| Alert::new(id.as_str(), "a"))
            .collect())
    }
}

/// Message sender and map pipeline double
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub uploads: Mutex<usize>,
}

#[async_trait]
impl MessageSender for RecordingTransport {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((subscriber_id, text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ArtifactUploader for RecordingTransport {
    async fn upload(&self, _raster: Vec<u8>) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        *uploads += 1;
        Ok(format!("photo-{}", *uploads))
    }
}

#[async_trait]
impl Rasterizer for RecordingTransport {
    async fn rasterize(&self, stem: &str, _svg: Vec<u8>) -> Result<Vec<u8>> {
        Ok(stem.as_bytes().to_vec())
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub source: Arc<StaticSource>,
    pub transport: Arc<RecordingTransport>,
    pub ledger: SubscriptionLedger,
    _dir: TempDir,
}

/// Create a test router backed by in-memory SQLite and recording doubles
pub async fn create_test_app() -> anyhow::Result<TestApp> {
    let dir = tempfile::tempdir()?;
    let template_path = dir.path().join("map.svg");
    std::fs::write(&template_path, MAP_TEMPLATE)?;

    let sqlite = SqliteClient::in_memory().await?;
    let pool = sqlite.pool().clone();
    init_schema(&pool).await?;

    let source = Arc::new(StaticSource::default());
    let transport = Arc::new(RecordingTransport::default());
    let alerts = AlertStore::new(pool.clone());
    let ledger = SubscriptionLedger::new(pool.clone());
    let fakes = Arc::new(FakeAlertInjector::new());

    let fanout = NotificationFanout::new(ledger.clone(), transport.clone());
    let engine = Arc::new(
        ReconciliationEngine::new(source.clone(), alerts.clone(), ledger.clone(), fanout)
            .with_fake_alerts(fakes.clone()),
    );
    let maps = MapRenderCache::new(
        MapArtifactStore::new(pool),
        template_path,
        transport.clone(),
        transport.clone(),
    );

    let state = AppState {
        service_name: "alertsrv".to_string(),
        engine,
        alerts,
        ledger: ledger.clone(),
        maps,
        fakes,
    };

    Ok(TestApp {
        router: routes::create_router(state),
        source,
        transport,
        ledger,
        _dir: dir,
    })
}
