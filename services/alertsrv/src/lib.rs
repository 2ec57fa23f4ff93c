//! Alert Service Library
//!
//! Wires the alert engine to its outer collaborators: HTTP alert feeds, the
//! Telegram Bot API and the admin HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod telegram;

pub use config::AppConfig;
pub use error::ApiError;
pub use providers::HttpAlertProvider;
pub use telegram::TelegramTransport;

use alert_engine::{
    AlertStore, FakeAlertInjector, MapRenderCache, ReconciliationEngine, SubscriptionLedger,
};
use std::sync::Arc;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub engine: Arc<ReconciliationEngine>,
    pub alerts: AlertStore,
    pub ledger: SubscriptionLedger,
    pub maps: MapRenderCache,
    pub fakes: Arc<FakeAlertInjector>,
}
