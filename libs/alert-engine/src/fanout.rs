//! Notification fanout - bounded-concurrency dispatch, one message per subscriber
//!
//! ```text
//! [Subscription] ──group──▶ {subscriber → [areas]} ──Semaphore(10)──▶ MessageSender
//!                                                           │
//!                                            Started wave ──┴──▶ ledger.mark_notified
//! ```

use crate::error::AlertError;
use crate::repository::SubscriptionLedger;
use crate::traits::MessageSender;
use crate::types::Subscription;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Default number of concurrent sends per wave
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default deadline for a single outbound message
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Which transition a wave announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wave {
    Started,
    Ended,
}

/// Outbound text per wave; `{areas}` is replaced by the comma-separated area list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplate {
    pub started: String,
    pub ended: String,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            started: "{areas}: тривога!".to_string(),
            ended: "тривога минула: {areas}".to_string(),
        }
    }
}

impl MessageTemplate {
    pub fn render(&self, wave: Wave, areas: &[String]) -> String {
        let template = match wave {
            Wave::Started => &self.started,
            Wave::Ended => &self.ended,
        };
        template.replace("{areas}", &areas.join(", "))
    }
}

/// All areas one subscriber should hear about in a wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberBatch {
    pub subscriber_id: i64,
    /// Ascending, without duplicates
    pub areas: Vec<String>,
}

/// Group subscriptions by subscriber in one pass
///
/// Batches come out in ascending subscriber order.
pub fn group_by_subscriber(group: &[Subscription]) -> Vec<SubscriberBatch> {
    let mut by_subscriber: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for subscription in group {
        by_subscriber
            .entry(subscription.subscriber_id)
            .or_default()
            .push(subscription.area.clone());
    }

    by_subscriber
        .into_iter()
        .map(|(subscriber_id, mut areas)| {
            areas.sort();
            areas.dedup();
            SubscriberBatch {
                subscriber_id,
                areas,
            }
        })
        .collect()
}

/// Outcome of one wave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutReport {
    /// Distinct subscribers in the wave
    pub subscribers: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Completion handle for an issued wave
pub struct FanoutHandle {
    wave: Wave,
    task: Option<JoinHandle<FanoutReport>>,
}

impl FanoutHandle {
    fn finished(wave: Wave) -> Self {
        Self { wave, task: None }
    }

    pub fn wave(&self) -> Wave {
        self.wave
    }

    /// Wait until every message of the wave has been attempted
    pub async fn wait(self) -> FanoutReport {
        let Some(task) = self.task else {
            return FanoutReport::default();
        };

        match task.await {
            Ok(report) => report,
            Err(e) => {
                error!("Fanout {:?} wave aborted: {}", self.wave, e);
                FanoutReport::default()
            },
        }
    }
}

/// Sends one merged message per affected subscriber
#[derive(Clone)]
pub struct NotificationFanout {
    ledger: SubscriptionLedger,
    sender: Arc<dyn MessageSender>,
    template: Arc<MessageTemplate>,
    concurrency: usize,
    send_timeout: Duration,
}

impl NotificationFanout {
    pub fn new(ledger: SubscriptionLedger, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            ledger,
            sender,
            template: Arc::new(MessageTemplate::default()),
            concurrency: DEFAULT_CONCURRENCY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_template(mut self, template: MessageTemplate) -> Self {
        self.template = Arc::new(template);
        self
    }

    /// Zero is treated as one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Issue a wave in the background and return its completion handle
    ///
    /// Must be called from within a Tokio runtime. An empty group spawns nothing.
    pub fn notify(&self, group: Vec<Subscription>, wave: Wave) -> FanoutHandle {
        let batches = group_by_subscriber(&group);
        if batches.is_empty() {
            return FanoutHandle::finished(wave);
        }

        info!(
            "Fanout {:?}: {} subscriptions, {} subscribers",
            wave,
            group.len(),
            batches.len()
        );

        let this = self.clone();
        let task = tokio::spawn(async move { this.dispatch(batches, wave).await });

        FanoutHandle {
            wave,
            task: Some(task),
        }
    }

    async fn dispatch(self, batches: Vec<SubscriberBatch>, wave: Wave) -> FanoutReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut report = FanoutReport {
            subscribers: batches.len(),
            ..Default::default()
        };
        let mut tasks = JoinSet::new();

        for batch in batches {
            // Permit is taken before spawning so at most `concurrency` units exist at once
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Fanout semaphore closed: {}", e);
                    break;
                },
            };

            let unit = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                unit.deliver(batch, wave).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.sent += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!("Fanout unit panicked: {}", e);
                    report.failed += 1;
                },
            }
        }

        debug!(
            "Fanout {:?} done: {} sent, {} failed",
            wave, report.sent, report.failed
        );
        report
    }

    /// Send one subscriber's message; returns whether the send succeeded
    async fn deliver(&self, batch: SubscriberBatch, wave: Wave) -> bool {
        let text = self.template.render(wave, &batch.areas);

        let outcome = match tokio::time::timeout(
            self.send_timeout,
            self.sender.send(batch.subscriber_id, &text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AlertError::Timeout(format!(
                "send exceeded {:?}",
                self.send_timeout
            ))),
        };

        if let Err(e) = outcome {
            warn!(
                "Failed to notify subscriber {} ({:?}: {}): {}",
                batch.subscriber_id,
                wave,
                batch.areas.join(", "),
                e
            );
            return false;
        }

        // Ended subscriptions are unmarked centrally by the engine
        if wave == Wave::Started {
            for area in batch.areas {
                let subscription = Subscription {
                    subscriber_id: batch.subscriber_id,
                    area,
                    notified: false,
                };
                if let Err(e) = self.ledger.mark_notified(&subscription).await {
                    error!(
                        "Failed to mark subscriber {} notified for {}: {}",
                        subscription.subscriber_id, subscription.area, e
                    );
                }
            }
        }

        true
    }
}
