//! Alert source composition: ordered provider fallback and operator-injected fake alerts

use crate::error::{AlertError, Result};
use crate::traits::AlertSource;
use crate::types::{Alert, AlertSet};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tries providers in priority order and returns the first snapshot that succeeds
pub struct FallbackAlertSource {
    providers: Vec<Arc<dyn AlertSource>>,
}

impl FallbackAlertSource {
    pub fn new(providers: Vec<Arc<dyn AlertSource>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(AlertError::Config(
                "at least one alert provider is required".to_string(),
            ));
        }
        Ok(Self { providers })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl AlertSource for FallbackAlertSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn fetch(&self) -> Result<AlertSet> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.fetch().await {
                Ok(alerts) => {
                    debug!(
                        "Provider {} returned {} active alerts",
                        provider.name(),
                        alerts.len()
                    );
                    return Ok(alerts);
                },
                Err(e) => {
                    warn!("Alert provider {} failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                },
            }
        }

        Err(AlertError::Fetch(format!(
            "all providers failed ({})",
            failures.join("; ")
        )))
    }
}

/// Kind recorded for injected alerts
pub const FAKE_ALERT_KIND: &str = "fake";

/// One-slot mailbox for a synthetic alert
///
/// The engine drains at most one pending alert per tick, so an injected alert
/// is active for exactly one tick and ends on the next.
#[derive(Default)]
pub struct FakeAlertInjector {
    pending: Mutex<Option<Alert>>,
}

impl FakeAlertInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a fake alert for `area`; fails with [`AlertError::Busy`] if one is pending
    pub fn inject(&self, area: &str) -> Result<()> {
        let area = area.trim();
        if area.is_empty() {
            return Err(AlertError::Config("fake alert area is empty".to_string()));
        }

        let mut pending = self.pending.lock();
        if let Some(existing) = pending.as_ref() {
            return Err(AlertError::Busy(format!(
                "fake alert for {} is still pending",
                existing.id
            )));
        }

        info!("Fake alert queued for {}", area);
        *pending = Some(Alert::new(area, FAKE_ALERT_KIND));
        Ok(())
    }

    /// Drain the pending alert, if any
    pub fn take(&self) -> Option<Alert> {
        self.pending.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    struct StaticSource {
        name: &'static str,
        result: Result<AlertSet>,
    }

    #[async_trait]
    impl AlertSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<AlertSet> {
            self.result.clone()
        }
    }

    fn source(name: &'static str, result: Result<AlertSet>) -> Arc<dyn AlertSource> {
        Arc::new(StaticSource { name, result })
    }

    fn one_alert(id: &str) -> AlertSet {
        std::iter::once(Alert::new(id, "a")).collect()
    }

    #[test]
    fn test_empty_provider_list_rejected() {
        assert!(matches!(
            FallbackAlertSource::new(Vec::new()),
            Err(AlertError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let fallback = FallbackAlertSource::new(vec![
            source("primary", Ok(one_alert("A"))),
            source("secondary", Ok(one_alert("B"))),
        ])
        .unwrap();

        let alerts = fallback.fetch().await.unwrap();
        assert!(alerts.contains("A"));
        assert!(!alerts.contains("B"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_falls_back_after_failure() {
        let fallback = FallbackAlertSource::new(vec![
            source("primary", Err(AlertError::Fetch("connection refused".into()))),
            source("secondary", Ok(one_alert("B"))),
        ])
        .unwrap();

        let alerts = fallback.fetch().await.unwrap();
        assert!(alerts.contains("B"));
        assert!(logs_contain("Alert provider primary failed"));
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_fetch_error() {
        let fallback = FallbackAlertSource::new(vec![
            source("primary", Err(AlertError::Fetch("timeout".into()))),
            source("secondary", Err(AlertError::Fetch("bad json".into()))),
        ])
        .unwrap();

        match fallback.fetch().await {
            Err(AlertError::Fetch(msg)) => {
                assert!(msg.contains("primary"));
                assert!(msg.contains("secondary"));
            },
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_fake_injector_single_slot() {
        let injector = FakeAlertInjector::new();
        injector.inject("Тестова область").unwrap();
        assert!(injector.is_pending());
        assert!(matches!(
            injector.inject("Інша область"),
            Err(AlertError::Busy(_))
        ));

        let alert = injector.take().unwrap();
        assert_eq!(alert.id, "Тестова область");
        assert_eq!(alert.kind, FAKE_ALERT_KIND);
        assert!(injector.take().is_none());

        injector.inject("Інша область").unwrap();
    }

    #[test]
    fn test_fake_injector_rejects_blank_area() {
        let injector = FakeAlertInjector::new();
        assert!(matches!(injector.inject("  "), Err(AlertError::Config(_))));
    }
}
