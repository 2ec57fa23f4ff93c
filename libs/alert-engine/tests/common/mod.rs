//! Common test utilities: in-memory database and scripted collaborators

#![allow(dead_code)]

use alert_engine::{
    init_schema, Alert, AlertError, AlertSet, AlertSource, ArtifactUploader, MessageSender,
    Rasterizer, Result,
};
use async_trait::async_trait;
use ::common::SqliteClient;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Single-connection in-memory database with the full schema
pub async fn setup_test_db() -> SqlitePool {
    let client = SqliteClient::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let pool = client.pool().clone();
    init_schema(&pool).await.expect("Failed to create schema");
    pool
}

pub fn alerts(ids: &[&str]) -> AlertSet {
    ids.iter().map(|id| Alert::new(*id, "a")).collect()
}

/// Source whose next snapshot is set by the test
pub struct ScriptedSource {
    next: Mutex<Result<AlertSet>>,
}

impl ScriptedSource {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            next: Mutex::new(Ok(alerts(ids))),
        }
    }

    pub fn set(&self, ids: &[&str]) {
        *self.next.lock() = Ok(alerts(ids));
    }

    pub fn fail(&self, reason: &str) {
        *self.next.lock() = Err(AlertError::Fetch(reason.to_string()));
    }
}

#[async_trait]
impl AlertSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self) -> Result<AlertSet> {
        self.next.lock().clone()
    }
}

/// Records every delivered message; sends to ids in `failing` return an error
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(i64, String)>>,
    failing: Mutex<HashSet<i64>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, subscriber_id: i64) {
        self.failing.lock().insert(subscriber_id);
    }

    pub fn recover(&self, subscriber_id: i64) {
        self.failing.lock().remove(&subscriber_id);
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().clone()
    }

    pub fn messages_for(&self, subscriber_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| *id == subscriber_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<()> {
        if self.failing.lock().contains(&subscriber_id) {
            return Err(AlertError::Send(format!("chat {} blocked", subscriber_id)));
        }
        self.sent.lock().push((subscriber_id, text.to_string()));
        Ok(())
    }
}

/// Sleeps on every send and records how many sends overlapped
pub struct SlowSender {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delivered: AtomicUsize,
    events: Mutex<Vec<&'static str>>,
}

impl SlowSender {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn record(&self, event: &'static str) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl MessageSender for SlowSender {
    async fn send(&self, _subscriber_id: i64, _text: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.record("send");

        tokio::time::sleep(self.delay).await;

        self.record("sent");
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts invocations; sleeps to widen the in-flight window
pub struct CountingRasterizer {
    calls: AtomicUsize,
    delay: Duration,
    failing: AtomicBool,
    last_svg: Mutex<Vec<u8>>,
}

impl CountingRasterizer {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            failing: AtomicBool::new(false),
            last_svg: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn last_svg(&self) -> String {
        String::from_utf8_lossy(&self.last_svg.lock()).into_owned()
    }
}

#[async_trait]
impl Rasterizer for CountingRasterizer {
    async fn rasterize(&self, stem: &str, svg: Vec<u8>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AlertError::Render("rasterizer 'convert' not found".to_string()));
        }
        *self.last_svg.lock() = svg;
        Ok(format!("PNG:{stem}").into_bytes())
    }
}

/// Returns `file-<n>` handles in upload order
#[derive(Default)]
pub struct CountingUploader {
    calls: AtomicUsize,
}

impl CountingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactUploader for CountingUploader {
    async fn upload(&self, raster: Vec<u8>) -> Result<String> {
        assert!(!raster.is_empty());
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("file-{n}"))
    }
}

/// Wait for a condition to be true with timeout
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
