//! Reconciliation engine - periodic fetch, replace, diff and notify
//!
//! Each tick walks `Idle → Fetching → Replacing → Notifying → Idle`:
//!
//! 1. fetch the active set from the [`AlertSource`]
//! 2. replace the stored set ([`AlertStore::replace`])
//! 3. read `eligible` and `ended` subscriptions from the ledger
//! 4. issue the "started" and "ended" fanout waves concurrently
//! 5. unmark ended subscriptions once both waves are issued
//! 6. wait for both waves
//!
//! Ticks are serialized by a mutex shared between the timer loop and
//! [`ReconciliationEngine::reconcile_now`], so mark/unmark of one tick never
//! races with the next.

use crate::error::{AlertError, Result};
use crate::fanout::{FanoutReport, NotificationFanout, Wave};
use crate::repository::{AlertStore, SubscriptionLedger};
use crate::source::FakeAlertInjector;
use crate::traits::AlertSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default reconciliation interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Fetching,
    Replacing,
    Notifying,
}

/// Outcome of a completed tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub active_alerts: usize,
    pub started: FanoutReport,
    pub ended: FanoutReport,
    /// Subscriptions flipped back to un-notified
    pub unmarked: u64,
}

pub struct ReconciliationEngine {
    source: Arc<dyn AlertSource>,
    alerts: AlertStore,
    ledger: SubscriptionLedger,
    fanout: NotificationFanout,
    fakes: Option<Arc<FakeAlertInjector>>,
    tick_lock: Mutex<()>,
    state: watch::Sender<EngineState>,
}

impl ReconciliationEngine {
    pub fn new(
        source: Arc<dyn AlertSource>,
        alerts: AlertStore,
        ledger: SubscriptionLedger,
        fanout: NotificationFanout,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            source,
            alerts,
            ledger,
            fanout,
            fakes: None,
            tick_lock: Mutex::new(()),
            state,
        }
    }

    /// Merge operator-injected fake alerts into fetched snapshots
    pub fn with_fake_alerts(mut self, injector: Arc<FakeAlertInjector>) -> Self {
        self.fakes = Some(injector);
        self
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Run one tick now, waiting for any tick already in progress
    pub async fn reconcile_now(&self) -> Result<TickReport> {
        let _tick = self.tick_lock.lock().await;
        let result = self.run_tick().await;
        self.state.send_replace(EngineState::Idle);
        result
    }

    async fn run_tick(&self) -> Result<TickReport> {
        self.state.send_replace(EngineState::Fetching);
        let mut fetched = self.source.fetch().await?;

        if let Some(alert) = self.fakes.as_ref().and_then(|fakes| fakes.take()) {
            info!("Injecting fake alert for {}", alert.id);
            fetched.insert(alert);
        }

        self.state.send_replace(EngineState::Replacing);
        self.alerts.replace(&fetched).await?;

        let eligible = self.ledger.eligible(&fetched).await?;
        let ended = self.ledger.alert_ended(&fetched).await?;

        if eligible.is_empty() && ended.is_empty() {
            debug!("No subscription changes ({} active alerts)", fetched.len());
        }

        self.state.send_replace(EngineState::Notifying);
        let started_wave = self.fanout.notify(eligible, Wave::Started);
        let ended_wave = self.fanout.notify(ended, Wave::Ended);

        // The ended group was captured above, so unmarking cannot change who the wave reaches
        let unmarked = match self.ledger.unmark(&fetched).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to unmark ended subscriptions: {}", e);
                0
            },
        };

        let (started, ended) = tokio::join!(started_wave.wait(), ended_wave.wait());

        Ok(TickReport {
            active_alerts: fetched.len(),
            started,
            ended,
            unmarked,
        })
    }

    /// Start the periodic loop
    ///
    /// Cancellation is only observed between ticks, so a tick that has begun
    /// always runs to completion before the loop exits.
    pub fn start(self: Arc<Self>, period: Duration, cancel: CancellationToken) -> EngineHandle {
        let task_token = cancel.clone();

        let task = tokio::spawn(async move {
            info!("Starting reconciliation loop every {:?}", period);

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => {
                        info!("Reconciliation loop received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                match self.reconcile_now().await {
                    Ok(report) => {
                        if report.started.subscribers > 0 || report.ended.subscribers > 0 {
                            info!(
                                "Tick: {} active, started {}/{} sent, ended {}/{} sent",
                                report.active_alerts,
                                report.started.sent,
                                report.started.subscribers,
                                report.ended.sent,
                                report.ended.subscribers
                            );
                        }
                    },
                    Err(e @ AlertError::Fetch(_)) => warn!("Tick abandoned: {}", e),
                    Err(e) => error!("Tick abandoned: {}", e),
                }
            }

            info!("Reconciliation loop stopped");
        });

        EngineHandle { task, cancel }
    }
}

/// Lifecycle handle for a running reconciliation loop
pub struct EngineHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for any in-flight tick to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Reconciliation loop terminated abnormally: {}", e);
        }
    }
}
