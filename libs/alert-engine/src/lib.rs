//! Alert Engine - alert reconciliation and notification library
//!
//! Provides:
//! - Periodic reconciliation of the active alert set against a provider feed
//! - Per-subscriber notification fanout with bounded concurrency
//! - Subscription ledger with exactly-once "started"/"ended" notices
//! - Single-flight render cache for painted alert maps
//! - SQLite persistence for alerts, subscriptions and map artifacts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────┐     ┌──────────────┐
//! │ AlertSource  │────▶│ ReconciliationEngine │────▶│  AlertStore  │
//! │ (fallback)   │     │     (interval)       │     │   (SQLite)   │
//! └──────────────┘     └──────────────────────┘     └──────────────┘
//!                                 │
//!                                 ▼
//!                      ┌──────────────────────┐     ┌──────────────┐
//!                      │ NotificationFanout   │────▶│MessageSender │
//!                      │ (Semaphore, ledger)  │     │              │
//!                      └──────────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌──────────────────────┐     ┌──────────────┐
//! │   AlertSet   │────▶│   MapRenderCache     │────▶│  Rasterizer  │
//! │              │     │   (single-flight)    │     │  + Uploader  │
//! └──────────────┘     └──────────────────────┘     └──────────────┘
//! ```

mod error;
pub mod engine;
pub mod fanout;
pub mod maps;
pub mod repository;
pub mod schema;
pub mod source;
pub mod traits;
pub mod types;

// Re-export public API
pub use engine::{
    EngineHandle, EngineState, ReconciliationEngine, TickReport, DEFAULT_TICK_INTERVAL,
};
pub use error::{AlertError, Result};
pub use fanout::{
    group_by_subscriber, FanoutHandle, FanoutReport, MessageTemplate, NotificationFanout,
    SubscriberBatch, Wave, DEFAULT_CONCURRENCY, DEFAULT_SEND_TIMEOUT,
};
pub use maps::{cache_stem, paint_areas, ConvertRasterizer, MapLookup, MapRenderCache};
pub use repository::{AlertStore, MapArtifactStore, SubscriptionLedger};
pub use schema::init_schema;
pub use source::{FakeAlertInjector, FallbackAlertSource, FAKE_ALERT_KIND};
pub use traits::{AlertSource, ArtifactUploader, MessageSender, Rasterizer};
pub use types::{Alert, AlertSet, MapArtifact, Subscription};
